use std::fs;
use std::path::{Path, PathBuf};

use assert_matches::assert_matches;

use kira_gsea::catalog::MetadataCatalog;
use kira_gsea::domain::{IdType, LibraryVersion};
use kira_gsea::error::KiraError;
use kira_gsea::msigdb::{LibraryEntry, MolecularSignaturesDatabase};

fn test_msigdb() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/test_msigdb")
}

#[test]
fn loads_libraries_by_version() {
    let msigdb_7_1 =
        MolecularSignaturesDatabase::new(test_msigdb(), LibraryVersion::from(7.1)).unwrap();
    assert_eq!(msigdb_7_1.version().as_str(), "7.1");
    assert_eq!(
        msigdb_7_1.gene_sets(),
        &[LibraryEntry {
            name: "c2.cp.reactome".to_string(),
            id_type: IdType::Symbols,
        }]
    );
    let reactome_7_1 = msigdb_7_1
        .load("c2.cp.reactome", IdType::Symbols)
        .unwrap()
        .into_inner();
    let by_name = reactome_7_1.gene_sets_by_name().unwrap();
    assert!(by_name.contains_key("REACTOME_NERVOUS_SYSTEM_DEVELOPMENT"));
    assert!(!by_name.contains_key("REACTOME_SERINE_BIOSYNTHESIS"));
    assert_eq!(reactome_7_1.name(), "c2.cp.reactome");

    let msigdb_7_0 =
        MolecularSignaturesDatabase::new(test_msigdb(), LibraryVersion::from(7.0)).unwrap();
    let reactome_7_0 = msigdb_7_0
        .load("c2.cp.reactome", IdType::Symbols)
        .unwrap()
        .into_inner();
    let by_name = reactome_7_0.gene_sets_by_name().unwrap();
    assert!(!by_name.contains_key("REACTOME_NERVOUS_SYSTEM_DEVELOPMENT"));
    assert!(by_name.contains_key("REACTOME_SERINE_BIOSYNTHESIS"));
}

#[test]
fn attaches_catalog_metadata_when_present() {
    let msigdb = MolecularSignaturesDatabase::new(test_msigdb(), "7.1".parse().unwrap()).unwrap();
    assert_eq!(
        msigdb.xml_path(),
        Some(test_msigdb().join("msigdb_v7.1.xml").as_path())
    );
    let reactome = msigdb
        .load("c2.cp.reactome", IdType::Symbols)
        .unwrap()
        .into_inner();
    let by_name = reactome.gene_sets_by_name().unwrap();
    let cell_cycle = by_name.get("REACTOME_CELL_CYCLE").unwrap();
    assert_eq!(
        cell_cycle.metadata().get("DESCRIPTION_BRIEF").map(String::as_str),
        Some("Cell Cycle & checkpoints")
    );
    assert_eq!(
        cell_cycle.metadata().get("SYSTEMATIC_NAME").map(String::as_str),
        Some("M543")
    );

    let without_catalog =
        MolecularSignaturesDatabase::new(test_msigdb(), "7.0".parse().unwrap()).unwrap();
    assert!(without_catalog.xml_path().is_none());
    let reactome = without_catalog
        .load("c2.cp.reactome", IdType::Symbols)
        .unwrap()
        .into_inner();
    assert!(reactome.iter().all(|gene_set| gene_set.metadata().is_empty()));
}

#[test]
fn fails_without_directory() {
    let err =
        MolecularSignaturesDatabase::new("wrong_dir_name", LibraryVersion::from(7.1)).unwrap_err();
    assert_matches!(&err, KiraError::MissingDatabase(_));
    assert_eq!(
        err.to_string(),
        "Could not find MSigDB: wrong_dir_name does not exist"
    );
}

#[test]
fn unknown_library_names_expected_path() {
    let msigdb =
        MolecularSignaturesDatabase::new(test_msigdb(), LibraryVersion::from(7.1)).unwrap();
    let expected = test_msigdb().join("c5.bp.v7.1.entrez.gmt");
    assert_matches!(
        msigdb.resolve("c5.bp", IdType::Entrez),
        Err(KiraError::UnknownLibrary(path)) if path == expected
    );
    assert_matches!(
        msigdb.load("c5.bp", IdType::Entrez),
        Err(KiraError::UnknownLibrary(_))
    );
}

#[test]
fn catalog_miss_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(
        temp.path().join("h.all.v7.1.symbols.gmt"),
        "HALLMARK_APOPTOSIS\t\tBAX\tBCL2\n",
    )
    .unwrap();
    fs::write(
        temp.path().join("msigdb_v7.1.xml"),
        "<MSIGDB><GENESET STANDARD_NAME=\"HALLMARK_HYPOXIA\"/></MSIGDB>",
    )
    .unwrap();

    let msigdb = MolecularSignaturesDatabase::new(temp.path(), LibraryVersion::from(7.1)).unwrap();
    assert_matches!(
        msigdb.load("h.all", IdType::Symbols),
        Err(KiraError::MissingCatalogEntry(name)) if name == "HALLMARK_APOPTOSIS"
    );
}

#[test]
fn malformed_library_name_is_fatal() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("c2.cp.v7.1.ensembl.gmt"), "A\t\tx\n").unwrap();
    assert_matches!(
        MolecularSignaturesDatabase::new(temp.path(), LibraryVersion::from(7.1)),
        Err(KiraError::MalformedLibraryName(_))
    );
}

#[test]
fn other_versions_are_ignored() {
    let temp = tempfile::tempdir().unwrap();
    fs::write(temp.path().join("h.all.v7.4.entrez.gmt"), "A\t\tx\n").unwrap();
    fs::write(temp.path().join("h.all.v7.41.entrez.gmt"), "A\t\tx\n").unwrap();
    fs::write(temp.path().join("notes.txt"), "").unwrap();
    let msigdb = MolecularSignaturesDatabase::new(temp.path(), LibraryVersion::default()).unwrap();
    assert_eq!(msigdb.gene_sets().len(), 1);
    assert_eq!(msigdb.gene_sets()[0].id_type, IdType::Entrez);
}

#[test]
fn catalog_parses_escaped_attributes() {
    let catalog = MetadataCatalog::parse(
        "<MSIGDB>\n<GENESET STANDARD_NAME='KEGG_A' DESCRIPTION_BRIEF=\"a &lt;b&gt; &#38; c\"/>\n</MSIGDB>",
    )
    .unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(
        catalog.get("KEGG_A").unwrap()["DESCRIPTION_BRIEF"],
        "a <b> & c"
    );
}
