//! tabspec SQL support
//!
//! Lowers specs into `CREATE TABLE` statements in three stages: the
//! [`SqlTarget`] builds a dialect-neutral [`CreateTable`], the dialect's
//! rules narrow it, and [`render`] prints it. [`SqlLoader`] reads DDL back
//! into a spec.

pub mod ast;
pub mod builder;
pub mod dialect;
pub mod loader;
pub mod normalize;
pub mod pipeline;
pub mod render;
pub mod rules;

pub use ast::{
    Clause, ColumnDef, CreateTable, Expr, IdentityDef, Literal, ObjectName, SqlType, StructField,
    TableConstraintDef,
};
pub use builder::{transform_expr, BuildOptions, SqlTarget};
pub use dialect::Dialect;
pub use loader::SqlLoader;
pub use pipeline::SqlConverter;
pub use render::{quote_ident, render, render_type, ArrayStyle, FileFormatStyle, Grammar, NestedStyle};
pub use rules::{DropIdentity, DropTableClause, Legalized, NodeRef, Rule, TypeRule, TypeStep, Violation};
