//! Content hash of a schema snapshot.
//!
//! Collections with set semantics (tables, columns of a table, full-text
//! columns, functions, virtual tables) are hashed by digesting every element
//! on its own, sorting the digests and feeding them in that order. Two
//! snapshots that differ only in discovery order therefore hash the same.
//! Column ids are sequence numbers from discovery and are left out, and so is
//! a table's primary column: with a composite key it depends on row order,
//! while the primary flags are already part of every column digest.

use sha2::{Digest, Sha256};

use super::{DBColumn, DBFunction, DBInfo, DBTable, VirtualTable};

type Digest32 = [u8; 32];

struct Fields(Sha256);

impl Fields {
    fn new(tag: &str) -> Self {
        let mut f = Fields(Sha256::new());
        f.str(tag);
        f
    }

    fn str(&mut self, s: &str) -> &mut Self {
        self.0.update((s.len() as u64).to_le_bytes());
        self.0.update(s.as_bytes());
        self
    }

    fn bool(&mut self, b: bool) -> &mut Self {
        self.0.update([b as u8]);
        self
    }

    fn int(&mut self, n: i64) -> &mut Self {
        self.0.update(n.to_le_bytes());
        self
    }

    fn digest(&mut self, d: &Digest32) -> &mut Self {
        self.0.update(d);
        self
    }

    fn set(&mut self, mut digests: Vec<Digest32>) -> &mut Self {
        digests.sort_unstable();
        self.int(digests.len() as i64);
        for d in &digests {
            self.digest(d);
        }
        self
    }

    fn opt_column(&mut self, c: Option<&DBColumn>) -> &mut Self {
        match c {
            Some(c) => self.bool(true).digest(&column_digest(c)),
            None => self.bool(false),
        }
    }

    fn finish(self) -> Digest32 {
        self.0.finalize().into()
    }
}

pub(crate) fn snapshot_hash(di: &DBInfo) -> u64 {
    let mut f = Fields::new("dbinfo");
    f.str(di.engine.as_str())
        .int(di.version)
        .str(&di.schema)
        .str(&di.name)
        .set(di.tables.iter().map(table_digest).collect())
        .set(di.functions.iter().map(function_digest).collect())
        .set(di.virtual_tables.iter().map(vtable_digest).collect());

    let d = f.finish();
    let mut head = [0u8; 8];
    head.copy_from_slice(&d[..8]);
    u64::from_be_bytes(head)
}

fn column_digest(c: &DBColumn) -> Digest32 {
    let mut f = Fields::new("column");
    f.str(&c.schema)
        .str(&c.table)
        .str(&c.name)
        .str(&c.col_type)
        .bool(c.array)
        .bool(c.not_null)
        .bool(c.primary_key)
        .bool(c.unique_key)
        .bool(c.full_text)
        .str(&c.fkey_schema)
        .str(&c.fkey_table)
        .str(&c.fkey_col)
        .bool(c.blocked);
    f.finish()
}

fn table_digest(t: &DBTable) -> Digest32 {
    let mut f = Fields::new("table");
    f.str(&t.schema)
        .str(&t.name)
        .str(&t.table_type)
        .set(t.columns.iter().map(column_digest).collect())
        .opt_column(t.secondary_col.as_ref())
        .set(t.full_text.iter().map(column_digest).collect())
        .bool(t.blocked);
    f.finish()
}

// Parameter order is significant.
fn function_digest(func: &DBFunction) -> Digest32 {
    let mut f = Fields::new("function");
    f.str(&func.name).int(func.params.len() as i64);
    for p in &func.params {
        f.int(p.id).str(&p.name).str(&p.param_type);
    }
    f.finish()
}

fn vtable_digest(v: &VirtualTable) -> Digest32 {
    let mut f = Fields::new("vtable");
    f.str(&v.name)
        .str(&v.id_column)
        .str(&v.type_column)
        .str(&v.fkey_column);
    f.finish()
}
