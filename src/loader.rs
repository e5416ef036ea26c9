//! Reads graphs and query pairs from SQLite3.
//!
//! The SQLite3 file must have the following schema:
//!
//! ```sql
//! CREATE TABLE edges (src INT, dst INT, weight REAL);
//! CREATE TABLE pairs (u INT, v INT);
//! ```
//!
//! `weight` is only read for weighted graphs and may be left out otherwise.

use crate::types::{VId, VertexPair};
use rusqlite::Connection;

/// One past the largest vertex id found in `edges` or `pairs`.
pub fn read_number_of_vertices(conn: &Connection) -> rusqlite::Result<VId> {
    let max: Option<VId> = conn
        .prepare(
            "SELECT MAX(id) FROM (
                SELECT src AS id FROM edges UNION ALL SELECT dst FROM edges
                UNION ALL SELECT u FROM pairs UNION ALL SELECT v FROM pairs)",
        )?
        .query_row([], |row| row.get(0))?;
    Ok(max.map_or(0, |max| max + 1))
}

pub fn read_edges(conn: &Connection) -> rusqlite::Result<Vec<(VId, VId)>> {
    let mut stmt = conn.prepare("SELECT src, dst FROM edges")?;
    let edges = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect();
    edges
}

pub fn read_weighted_edges(conn: &Connection) -> rusqlite::Result<Vec<(VId, VId, f64)>> {
    let mut stmt = conn.prepare("SELECT src, dst, weight FROM edges")?;
    let edges = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect();
    edges
}

/// The query pairs in insertion order.
pub fn read_pairs(conn: &Connection) -> rusqlite::Result<Vec<VertexPair>> {
    let mut stmt = conn.prepare("SELECT u, v FROM pairs ORDER BY rowid")?;
    let pairs = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect();
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::params;

    fn create_db(path: &std::path::Path) -> Connection {
        let conn = Connection::open(path).unwrap();
        conn.execute("CREATE TABLE edges (src INT, dst INT, weight REAL)", [])
            .unwrap();
        conn.execute("CREATE TABLE pairs (u INT, v INT)", []).unwrap();
        for &(src, dst, weight) in &[(0, 1, 0.5), (1, 2, 1.5), (2, 6, 2.5)] {
            conn.execute(
                "INSERT INTO edges VALUES (?1, ?2, ?3)",
                params![src, dst, weight],
            )
            .unwrap();
        }
        for &(u, v) in &[(2, 0), (0, 9)] {
            conn.execute("INSERT INTO pairs VALUES (?1, ?2)", params![u, v])
                .unwrap();
        }
        conn
    }

    #[test]
    fn test_read_sqlite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.sqlite3");
        drop(create_db(&path));
        let conn = Connection::open(&path).unwrap();
        assert_eq!(read_number_of_vertices(&conn).unwrap(), 10);
        assert_eq!(read_edges(&conn).unwrap(), vec![(0, 1), (1, 2), (2, 6)]);
        assert_eq!(
            read_weighted_edges(&conn).unwrap(),
            vec![(0, 1, 0.5), (1, 2, 1.5), (2, 6, 2.5)]
        );
        assert_eq!(read_pairs(&conn).unwrap(), vec![(2, 0), (0, 9)]);
    }

    #[test]
    fn test_empty_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE edges (src INT, dst INT)", [])
            .unwrap();
        conn.execute("CREATE TABLE pairs (u INT, v INT)", []).unwrap();
        assert_eq!(read_number_of_vertices(&conn).unwrap(), 0);
        assert!(read_edges(&conn).unwrap().is_empty());
        assert!(read_weighted_edges(&conn).is_err());
    }
}
