pub mod app;
pub mod catalog;
pub mod config;
pub mod diagnostics;
pub mod domain;
pub mod engine;
pub mod error;
pub mod expression;
pub mod frame;
pub mod gene_set;
pub mod gene_sets;
pub mod gmt;
pub mod msigdb;
pub mod output;
pub mod table;
