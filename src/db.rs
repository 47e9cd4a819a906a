// 🗄️ Record Store - Members, payments, entry log, id counter
//
// The kiosk persists four named slots in a plain key-value string store.
// Each slot holds JSON text and is overwritten in full on every write.
//
// Concurrency: single writer only. `next_id` is read-increment-persist with
// no transaction around it; two concurrent callers against the same backend
// could be handed the same id.

use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;

/// Slot holding the member list
pub const MEMBERS_KEY: &str = "gym_usuarios";
/// Slot holding the payment list
pub const PAYMENTS_KEY: &str = "gym_pagos";
/// Slot holding the entry log
pub const ENTRIES_KEY: &str = "gym_ingresos";
/// Slot holding the next id to hand out
pub const NEXT_ID_KEY: &str = "gym_next_id";

// ============================================================================
// ID NORMALIZATION
// ============================================================================

/// Canonical member identifier.
///
/// Stored records carry member ids as JSON numbers or strings
/// (`1`, `"1"`, `" 1 "`). They are all normalized here, once, so the
/// rest of the crate compares plain strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MemberId(String);

impl MemberId {
    pub fn new(raw: impl AsRef<str>) -> Self {
        MemberId(raw.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<i64> for MemberId {
    fn from(id: i64) -> Self {
        MemberId(id.to_string())
    }
}

impl From<i32> for MemberId {
    fn from(id: i32) -> Self {
        MemberId(id.to_string())
    }
}

impl From<&str> for MemberId {
    fn from(id: &str) -> Self {
        MemberId::new(id)
    }
}

impl Serialize for MemberId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        // Numeric ids go back out as numbers, like the records they came from
        match self.0.parse::<i64>() {
            Ok(n) => serializer.serialize_i64(n),
            Err(_) => serializer.serialize_str(&self.0),
        }
    }
}

impl<'de> Deserialize<'de> for MemberId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        Ok(MemberId::new(scalar_to_string(deserializer)?))
    }
}

/// Loosely typed JSON scalar as found in hand-edited records
#[derive(Deserialize)]
#[serde(untagged)]
enum RawScalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Text(String),
}

impl RawScalar {
    fn into_string(self) -> String {
        match self {
            RawScalar::Int(n) => n.to_string(),
            RawScalar::Float(f) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => {
                (f as i64).to_string()
            }
            RawScalar::Float(f) => f.to_string(),
            RawScalar::Bool(b) => b.to_string(),
            RawScalar::Text(s) => s,
        }
    }
}

/// Number, string or null → trimmed string (null → empty)
fn scalar_to_string<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<String, D::Error> {
    let raw: Option<RawScalar> = Option::deserialize(deserializer)?;
    Ok(raw.map(RawScalar::into_string).unwrap_or_default().trim().to_string())
}

/// Number or numeric string → i64, anything else → 0
fn lenient_i64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<i64, D::Error> {
    Ok(scalar_to_string(deserializer)?.parse().unwrap_or(0))
}

// ============================================================================
// DATA MODEL
// ============================================================================

/// Gym member. Read-only from the kiosk's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,

    /// National ID number, the external lookup key
    #[serde(default, deserialize_with = "scalar_to_string")]
    pub dni: String,

    #[serde(default, deserialize_with = "scalar_to_string")]
    pub nombre: String,

    /// Membership expiry date; empty when none is on file
    #[serde(default, deserialize_with = "scalar_to_string")]
    pub fecha_vencimiento: String,

    /// Fields the kiosk doesn't interpret (apellido, email, ...)
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Member {
    pub fn new(id: impl Into<MemberId>, dni: &str, nombre: &str, fecha_vencimiento: &str) -> Self {
        Member {
            id: id.into(),
            dni: dni.trim().to_string(),
            nombre: nombre.to_string(),
            fecha_vencimiento: fecha_vencimiento.trim().to_string(),
            extra: HashMap::new(),
        }
    }
}

/// Payment record. Many per member, no uniqueness constraint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub id: i64,

    #[serde(default)]
    pub usuario_id: MemberId,

    /// Category label, e.g. "Mensualidad"
    #[serde(default, deserialize_with = "scalar_to_string")]
    pub tipo: String,

    /// Free-text status, e.g. "Pagado", "Pendiente"
    #[serde(default, deserialize_with = "scalar_to_string")]
    pub estado: String,

    #[serde(default, deserialize_with = "scalar_to_string")]
    pub fecha: String,

    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl Payment {
    pub fn new(id: i64, usuario_id: impl Into<MemberId>, tipo: &str, estado: &str, fecha: &str) -> Self {
        Payment {
            id,
            usuario_id: usuario_id.into(),
            tipo: tipo.to_string(),
            estado: estado.to_string(),
            fecha: fecha.to_string(),
            extra: HashMap::new(),
        }
    }
}

/// One admitted entry. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryRecord {
    #[serde(deserialize_with = "lenient_i64")]
    pub id: i64,

    pub usuario_id: MemberId,

    /// ISO-8601 UTC timestamp of the entry
    #[serde(default, deserialize_with = "scalar_to_string")]
    pub fecha: String,
}

// ============================================================================
// KEY-VALUE BACKENDS
// ============================================================================

/// Persistent string store the kiosk writes through.
///
/// Writes overwrite the whole slot. Backends are assumed reliable; their
/// errors only surface as `anyhow` errors to the caller.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-process store, lost on drop
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slots: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.slots.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.slots.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// SQLite-backed store: one `kv` table, WAL journal
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {:?}", path))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        setup_database(&conn)?;
        Ok(SqliteStore { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value: Option<String> = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .with_context(|| format!("Failed to read slot {}", key))?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO kv (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )
            .with_context(|| format!("Failed to write slot {}", key))?;
        Ok(())
    }
}

pub fn setup_database(conn: &Connection) -> Result<()> {
    // Enable WAL mode for crash recovery
    conn.pragma_update(None, "journal_mode", "WAL")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS kv (
            key TEXT PRIMARY KEY NOT NULL,
            value TEXT NOT NULL
        )",
        [],
    )?;

    Ok(())
}

// ============================================================================
// RECORD STORE
// ============================================================================

/// Typed view over the four kiosk slots
pub struct RecordStore<S> {
    backend: S,
}

impl<S: KeyValueStore> RecordStore<S> {
    pub fn new(backend: S) -> Self {
        RecordStore { backend }
    }

    pub fn backend(&self) -> &S {
        &self.backend
    }

    pub fn into_inner(self) -> S {
        self.backend
    }

    pub fn load_members(&self) -> Result<Vec<Member>> {
        self.load_list(MEMBERS_KEY)
    }

    pub fn load_payments(&self) -> Result<Vec<Payment>> {
        self.load_list(PAYMENTS_KEY)
    }

    pub fn load_entries(&self) -> Result<Vec<EntryRecord>> {
        self.load_list(ENTRIES_KEY)
    }

    /// Seed the member slot (import tooling and tests)
    pub fn save_members(&mut self, members: &[Member]) -> Result<()> {
        self.save_list(MEMBERS_KEY, members)
    }

    /// Seed the payment slot (import tooling and tests)
    pub fn save_payments(&mut self, payments: &[Payment]) -> Result<()> {
        self.save_list(PAYMENTS_KEY, payments)
    }

    pub fn save_entries(&mut self, entries: &[EntryRecord]) -> Result<()> {
        self.save_list(ENTRIES_KEY, entries)
    }

    /// Member whose trimmed DNI equals `dni` exactly
    pub fn find_member_by_dni(&self, dni: &str) -> Result<Option<Member>> {
        let dni = dni.trim();
        Ok(self.load_members()?.into_iter().find(|m| m.dni == dni))
    }

    pub fn entries_for_member(&self, member_id: &MemberId) -> Result<Vec<EntryRecord>> {
        Ok(self
            .load_entries()?
            .into_iter()
            .filter(|e| &e.usuario_id == member_id)
            .collect())
    }

    /// Value the next `next_id` call will hand out (1 when the slot is absent)
    pub fn peek_next_id(&self) -> Result<i64> {
        match self.backend.get(NEXT_ID_KEY)? {
            Some(raw) => raw
                .trim()
                .parse()
                .with_context(|| format!("Invalid id counter in {}: {:?}", NEXT_ID_KEY, raw)),
            None => Ok(1),
        }
    }

    /// Hand out the current counter value and persist value + 1.
    ///
    /// Not atomic: assumes this store has a single writer.
    pub fn next_id(&mut self) -> Result<i64> {
        let id = self.peek_next_id()?;
        self.backend.set(NEXT_ID_KEY, &(id + 1).to_string())?;
        Ok(id)
    }

    fn load_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.backend.get(key)? {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse {} JSON", key)),
            _ => Ok(Vec::new()),
        }
    }

    fn save_list<T: Serialize>(&mut self, key: &str, items: &[T]) -> Result<()> {
        let json = serde_json::to_string(items)?;
        self.backend.set(key, &json)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_store_defaults() {
        let store = RecordStore::new(MemoryStore::new());

        assert!(store.load_members().unwrap().is_empty());
        assert!(store.load_payments().unwrap().is_empty());
        assert!(store.load_entries().unwrap().is_empty());
        assert_eq!(store.peek_next_id().unwrap(), 1);
    }

    #[test]
    fn test_next_id_is_monotonic() {
        let mut store = RecordStore::new(MemoryStore::new());

        assert_eq!(store.next_id().unwrap(), 1);
        assert_eq!(store.next_id().unwrap(), 2);
        assert_eq!(store.next_id().unwrap(), 3);
        assert_eq!(store.backend().get(NEXT_ID_KEY).unwrap(), Some("4".to_string()));
    }

    #[test]
    fn test_next_id_resumes_from_stored_value() {
        let mut backend = MemoryStore::new();
        backend.set(NEXT_ID_KEY, "41").unwrap();
        let mut store = RecordStore::new(backend);

        assert_eq!(store.next_id().unwrap(), 41);
        assert_eq!(store.peek_next_id().unwrap(), 42);
    }

    #[test]
    fn test_ids_normalized_at_boundary() {
        let mut backend = MemoryStore::new();
        backend
            .set(
                MEMBERS_KEY,
                r#"[
                    {"id": 7, "dni": 30111222, "nombre": "Ana", "fecha_vencimiento": null},
                    {"id": " 8 ", "dni": " 28999888 ", "nombre": "Luis", "apellido": "Paz"}
                ]"#,
            )
            .unwrap();
        backend
            .set(
                PAYMENTS_KEY,
                r#"[{"id": "3", "usuario_id": "7", "tipo": "Mensualidad", "estado": "Pagado", "fecha": "2025-01-01"}]"#,
            )
            .unwrap();
        let store = RecordStore::new(backend);

        let members = store.load_members().unwrap();
        assert_eq!(members[0].id, MemberId::from(7));
        assert_eq!(members[0].dni, "30111222");
        assert_eq!(members[0].fecha_vencimiento, "");
        assert_eq!(members[1].id, MemberId::from(8));
        assert_eq!(members[1].dni, "28999888");
        assert_eq!(members[1].extra.get("apellido"), Some(&serde_json::json!("Paz")));

        let payments = store.load_payments().unwrap();
        assert_eq!(payments[0].id, 3);
        assert_eq!(payments[0].usuario_id, members[0].id);
    }

    #[test]
    fn test_find_member_by_dni() {
        let mut store = RecordStore::new(MemoryStore::new());
        store
            .save_members(&[
                Member::new(1, "12345678", "Ana", "2030-01-01"),
                Member::new(2, "87654321", "Luis", ""),
            ])
            .unwrap();

        let found = store.find_member_by_dni(" 87654321").unwrap().unwrap();
        assert_eq!(found.nombre, "Luis");
        assert!(store.find_member_by_dni("1234567").unwrap().is_none());
    }

    #[test]
    fn test_numeric_member_id_serializes_as_number() {
        let entry = EntryRecord {
            id: 5,
            usuario_id: MemberId::from(12),
            fecha: "2025-01-01T10:00:00.000Z".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["usuario_id"], serde_json::json!(12));

        let opaque = serde_json::to_value(MemberId::new("abc-1")).unwrap();
        assert_eq!(opaque, serde_json::json!("abc-1"));
    }

    #[test]
    fn test_corrupt_slot_is_an_error() {
        let mut backend = MemoryStore::new();
        backend.set(ENTRIES_KEY, "{not json").unwrap();
        let store = RecordStore::new(backend);

        assert!(store.load_entries().is_err());
    }

    #[test]
    fn test_sqlite_store_round_trip() {
        let mut store = RecordStore::new(SqliteStore::open_in_memory().unwrap());

        store.save_members(&[Member::new(1, "12345678", "Ana", "2030-01-01")]).unwrap();
        assert_eq!(store.next_id().unwrap(), 1);
        assert_eq!(store.next_id().unwrap(), 2);

        let members = store.load_members().unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].dni, "12345678");
        assert_eq!(store.peek_next_id().unwrap(), 3);
    }

    #[test]
    fn test_sqlite_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gym.db");

        {
            let mut store = RecordStore::new(SqliteStore::open(&path).unwrap());
            store.next_id().unwrap();
            store.next_id().unwrap();
        }

        let store = RecordStore::new(SqliteStore::open(&path).unwrap());
        assert_eq!(store.peek_next_id().unwrap(), 3);
    }
}
