//! Logical-plan view of a parsed statement batch.
//!
//! The host pipeline hands the interceptor a traversable operator tree; here
//! that tree is the sqlparser AST. The plan walks it depth-first and records
//! every insert/update/delete node with the table it targets.

use crate::error::TimeloomResult;
use sqlparser::ast::{FromTable, ObjectName, ObjectNamePart, Statement, TableFactor, TableObject};
use sqlparser::dialect::GenericDialect;
use sqlparser::parser::{Parser, ParserOptions};

const SQL_RECURSION_LIMIT: usize = 512;

/// Kind of data-mutation node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmlKind {
    Insert,
    Update,
    Delete,
}

/// A data-mutation node found in the plan, with its target table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DmlTarget {
    pub kind: DmlKind,
    pub table: String,
}

/// A parsed statement batch with its collected DML nodes.
pub struct StatementPlan {
    statements: Vec<Statement>,
    dml: Vec<DmlTarget>,
}

impl StatementPlan {
    /// Parse SQL into a plan.
    pub fn parse(sql: &str) -> TimeloomResult<Self> {
        let dialect = GenericDialect {};
        let statements = Parser::new(&dialect)
            .with_options(ParserOptions::new().with_trailing_commas(true))
            .with_recursion_limit(SQL_RECURSION_LIMIT)
            .try_with_sql(sql)?
            .parse_statements()?;

        let mut dml = Vec::new();
        for statement in &statements {
            collect_dml(statement, &mut dml);
        }

        Ok(Self { statements, dml })
    }

    /// The parsed statements, in order.
    pub fn statements(&self) -> &[Statement] {
        &self.statements
    }

    /// All DML nodes found, in depth-first order.
    pub fn dml_targets(&self) -> &[DmlTarget] {
        &self.dml
    }

    /// Whether the plan contains no data-mutation nodes at all.
    pub fn is_read_only(&self) -> bool {
        self.dml.is_empty()
    }
}

fn collect_dml(statement: &Statement, out: &mut Vec<DmlTarget>) {
    match statement {
        Statement::Insert(insert) => {
            if let TableObject::TableName(name) = &insert.table {
                if let Some(table) = object_name_to_string(name) {
                    out.push(DmlTarget {
                        kind: DmlKind::Insert,
                        table,
                    });
                }
            }
        }
        Statement::Update(sqlparser::ast::Update { table, .. }) => {
            if let TableFactor::Table { name, .. } = &table.relation {
                if let Some(table) = object_name_to_string(name) {
                    out.push(DmlTarget {
                        kind: DmlKind::Update,
                        table,
                    });
                }
            }
        }
        Statement::Delete(delete) => {
            let tables = match &delete.from {
                FromTable::WithFromKeyword(tables) | FromTable::WithoutKeyword(tables) => tables,
            };
            if let Some(table_with_joins) = tables.first() {
                if let TableFactor::Table { name, .. } = &table_with_joins.relation {
                    if let Some(table) = object_name_to_string(name) {
                        out.push(DmlTarget {
                            kind: DmlKind::Delete,
                            table,
                        });
                    }
                }
            }
        }
        _ => {}
    }
}

/// Render an unqualified or dotted object name as a plain table name.
fn object_name_to_string(name: &ObjectName) -> Option<String> {
    let parts: Vec<String> = name
        .0
        .iter()
        .filter_map(|part| match part {
            ObjectNamePart::Identifier(ident) => Some(ident.value.clone()),
            _ => None,
        })
        .collect();
    // SQLite table references are at most schema.table; take the last part.
    parts.last().cloned()
}
