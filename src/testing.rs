//! Test fixtures: record types and an in-memory connection provider
//! that interprets the synthesized statement shapes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use convert_case::{Case, Casing};
use uuid::Uuid;

use crate::command::SqlCommand;
use crate::error::{Error, Result};
use crate::provider::{Connection, ConnectionProvider, Transaction};
use crate::record::{ColumnSpec, ColumnType, Record};
use crate::row::Row;
use crate::statement::StatementKind;
use crate::value::Value;

// ----- fixture records -----

#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub date_created: DateTime<Utc>,
    pub last_modified: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub user_name: String,
    pub email: String,
    pub age: i64,
}

impl User {
    pub fn named(user_name: &str) -> Self {
        Self {
            id: Uuid::nil(),
            date_created: Utc::now(),
            last_modified: None,
            created_by: None,
            user_name: user_name.to_string(),
            email: format!("{user_name}@example.com"),
            age: 30,
        }
    }
}

static USER_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::key("Id", ColumnType::Uuid),
    ColumnSpec::new("DateCreated", ColumnType::Timestamptz),
    ColumnSpec::new("LastModified", ColumnType::Timestamptz).nullable(),
    ColumnSpec::new("CreatedBy", ColumnType::Uuid).nullable(),
    ColumnSpec::new("UserName", ColumnType::Text),
    ColumnSpec::new("Email", ColumnType::Text),
    ColumnSpec::new("Age", ColumnType::BigInt),
];

impl Record for User {
    const TABLE: &'static str = "users";

    fn columns() -> &'static [ColumnSpec] {
        USER_COLUMNS
    }

    fn id(&self) -> Uuid {
        self.id
    }

    fn set_id(&mut self, id: Uuid) {
        self.id = id;
    }

    fn date_created(&self) -> DateTime<Utc> {
        self.date_created
    }

    fn set_date_created(&mut self, at: DateTime<Utc>) {
        self.date_created = at;
    }

    fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }

    fn set_last_modified(&mut self, at: Option<DateTime<Utc>>) {
        self.last_modified = at;
    }

    fn to_row(&self) -> Vec<(String, Value)> {
        vec![
            ("Id".into(), self.id.into()),
            ("DateCreated".into(), self.date_created.into()),
            ("LastModified".into(), self.last_modified.into()),
            ("CreatedBy".into(), self.created_by.into()),
            ("UserName".into(), self.user_name.as_str().into()),
            ("Email".into(), self.email.as_str().into()),
            ("Age".into(), self.age.into()),
        ]
    }

    fn from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: row.uuid("id")?,
            date_created: row.timestamp("date_created")?,
            last_modified: row.timestamp_opt("last_modified")?,
            created_by: match row.get("created_by") {
                Some(Value::Uuid(u)) => Some(*u),
                _ => None,
            },
            user_name: row.text("user_name")?,
            email: row.text("email")?,
            age: row.int("age")?,
        })
    }
}

macro_rules! stub_record {
    ($name:ident, $table:literal, $columns:expr) => {
        #[derive(Debug, Clone)]
        pub struct $name;

        impl Record for $name {
            const TABLE: &'static str = $table;

            fn columns() -> &'static [ColumnSpec] {
                $columns
            }

            fn id(&self) -> Uuid {
                Uuid::nil()
            }
            fn set_id(&mut self, _: Uuid) {}
            fn date_created(&self) -> DateTime<Utc> {
                Utc::now()
            }
            fn set_date_created(&mut self, _: DateTime<Utc>) {}
            fn last_modified(&self) -> Option<DateTime<Utc>> {
                None
            }
            fn set_last_modified(&mut self, _: Option<DateTime<Utc>>) {}
            fn to_row(&self) -> Vec<(String, Value)> {
                Vec::new()
            }
            fn from_row(_: &Row) -> Result<Self> {
                Err(Error::config("stub record"))
            }
        }
    };
}

static NO_KEY_COLUMNS: &[ColumnSpec] = &[ColumnSpec::new("Name", ColumnType::Text)];
static TWO_KEY_COLUMNS: &[ColumnSpec] = &[
    ColumnSpec::key("Id", ColumnType::Uuid),
    ColumnSpec::key("Other", ColumnType::Uuid),
];

stub_record!(NoKeyRecord, "no_key", NO_KEY_COLUMNS);
stub_record!(TwoKeyRecord, "two_key", TWO_KEY_COLUMNS);

// ----- in-memory provider -----

#[derive(Debug, Clone, Default)]
pub struct MockState {
    tables: HashMap<String, Vec<Row>>,
    pub executed: Vec<String>,
    pub fail_marker: Option<String>,
}

impl MockState {
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.tables.get(table).cloned().unwrap_or_default()
    }
}

/// Interprets synthesized commands by their shape tag against in-memory
/// tables. Raw commands (no shape) are logged and succeed, which is what
/// migration DDL needs.
#[derive(Clone, Default)]
pub struct MockProvider {
    state: Arc<Mutex<MockState>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Any executed SQL containing the marker fails.
    pub fn fail_on(&self, marker: &str) {
        self.state.lock().unwrap().fail_marker = Some(marker.to_string());
    }

    pub fn snapshot(&self) -> MockState {
        self.state.lock().unwrap().clone()
    }
}

pub struct MockConnection {
    state: Arc<Mutex<MockState>>,
}

pub struct MockTransaction {
    master: Arc<Mutex<MockState>>,
    work: MockState,
}

#[async_trait]
impl ConnectionProvider for MockProvider {
    type Connection = MockConnection;
    type Transaction = MockTransaction;

    async fn acquire(&self) -> Result<MockConnection> {
        Ok(MockConnection {
            state: Arc::clone(&self.state),
        })
    }

    async fn begin(&self) -> Result<MockTransaction> {
        let work = self.state.lock().unwrap().clone();
        Ok(MockTransaction {
            master: Arc::clone(&self.state),
            work,
        })
    }
}

#[async_trait]
impl Connection for MockConnection {
    async fn query(&mut self, cmd: &SqlCommand) -> Result<Vec<Row>> {
        run(&mut self.state.lock().unwrap(), cmd).map(|(rows, _)| rows)
    }

    async fn execute(&mut self, cmd: &SqlCommand) -> Result<u64> {
        run(&mut self.state.lock().unwrap(), cmd).map(|(_, affected)| affected)
    }
}

#[async_trait]
impl Connection for MockTransaction {
    async fn query(&mut self, cmd: &SqlCommand) -> Result<Vec<Row>> {
        run(&mut self.work, cmd).map(|(rows, _)| rows)
    }

    async fn execute(&mut self, cmd: &SqlCommand) -> Result<u64> {
        run(&mut self.work, cmd).map(|(_, affected)| affected)
    }
}

#[async_trait]
impl Transaction for MockTransaction {
    async fn commit(self) -> Result<()> {
        *self.master.lock().unwrap() = self.work;
        Ok(())
    }

    async fn rollback(self) -> Result<()> {
        Ok(())
    }
}

fn snake(name: &str) -> String {
    name.to_case(Case::Snake)
}

fn table_of(text: &str) -> String {
    for marker in ["FROM \"", "INTO \"", "UPDATE \"", "EXISTS \""] {
        if let Some(start) = text.find(marker) {
            let rest = &text[start + marker.len()..];
            if let Some(end) = rest.find('"') {
                return rest[..end].to_string();
            }
        }
    }
    "unknown".to_string()
}

fn row_from_params(params: &[(String, Value)]) -> Row {
    params
        .iter()
        .map(|(name, value)| (snake(name), value.clone()))
        .collect()
}

fn row_id(row: &Row) -> Uuid {
    match row.get("id") {
        Some(Value::Uuid(u)) => *u,
        _ => Uuid::nil(),
    }
}

fn row_created(row: &Row) -> DateTime<Utc> {
    match row.get("date_created") {
        Some(Value::Timestamp(t)) => *t,
        _ => DateTime::<Utc>::MIN_UTC,
    }
}

fn matches(row: &Row, entries: &[(String, Value)], any: bool) -> bool {
    if entries.is_empty() {
        return true;
    }
    let hit = |(name, value): &(String, Value)| row.get(&snake(name)) == Some(value);
    if any {
        entries.iter().any(hit)
    } else {
        entries.iter().all(hit)
    }
}

/// Parameter names referenced in the guard segment of a conditional
/// statement, in order of appearance.
fn guard_entries(segment: &str, params: &[(String, Value)]) -> Vec<(String, Value)> {
    let mut entries = Vec::new();
    let mut rest = segment;
    while let Some(at) = rest.find('@') {
        rest = &rest[at + 1..];
        let end = rest
            .find(|c: char| !c.is_alphanumeric())
            .unwrap_or(rest.len());
        let name = &rest[..end];
        if let Some((n, v)) = params.iter().find(|(n, _)| n == name) {
            entries.push((n.clone(), v.clone()));
        }
        rest = &rest[end..];
    }
    entries
}

fn run(state: &mut MockState, cmd: &SqlCommand) -> Result<(Vec<Row>, u64)> {
    if let Some(marker) = &state.fail_marker {
        if cmd.text().contains(marker.as_str()) {
            return Err(Error::execution(
                "forced failure",
                cmd.text(),
                cmd.params_snapshot(),
            ));
        }
    }
    state.executed.push(cmd.text().to_string());

    let Some(shape) = cmd.shape() else {
        // Raw SQL (migration DDL, escape hatches): succeed without rows.
        return Ok((Vec::new(), 0));
    };

    let table = table_of(cmd.text());
    let params = cmd.params_snapshot();
    let any = cmd.text().contains(" OR ");
    let rows = state.tables.entry(table).or_default();

    Ok(match shape {
        StatementKind::EnsureTable => (Vec::new(), 0),
        StatementKind::Insert => {
            rows.push(row_from_params(&params));
            (Vec::new(), 1)
        }
        StatementKind::Update => {
            let target = params
                .iter()
                .find(|(n, _)| n == "Id")
                .map(|(_, v)| v.clone());
            let mut affected = 0;
            for row in rows.iter_mut() {
                if row.get("id") == target.as_ref() {
                    *row = row_from_params(&params);
                    affected += 1;
                }
            }
            (Vec::new(), affected)
        }
        StatementKind::DeleteById => {
            let ids: Vec<Value> = params.iter().map(|(_, v)| v.clone()).collect();
            let before = rows.len();
            rows.retain(|row| !ids.iter().any(|v| row.get("id") == Some(v)));
            (Vec::new(), (before - rows.len()) as u64)
        }
        StatementKind::DeleteAll => {
            let before = rows.len();
            rows.clear();
            (Vec::new(), before as u64)
        }
        StatementKind::DeleteBy => {
            let before = rows.len();
            rows.retain(|row| !matches(row, &params, any));
            (Vec::new(), (before - rows.len()) as u64)
        }
        StatementKind::All => (rows.clone(), 0),
        StatementKind::GetById | StatementKind::GetBy | StatementKind::Filter => {
            let found: Vec<Row> = rows
                .iter()
                .filter(|row| matches(row, &params, any))
                .cloned()
                .collect();
            (found, 0)
        }
        StatementKind::Count => {
            let mut row = Row::new();
            row.push("count", Value::Int(rows.len() as i64));
            (vec![row], 0)
        }
        StatementKind::Exists => {
            let hit = rows.iter().any(|row| matches(row, &params, any));
            let mut row = Row::new();
            row.push("exists", Value::Bool(hit));
            (vec![row], 0)
        }
        StatementKind::First | StatementKind::Last => {
            let mut sorted = rows.clone();
            sorted.sort_by_key(|r| (row_created(r), row_id(r)));
            if shape == StatementKind::Last {
                sorted.reverse();
            }
            (sorted.into_iter().take(1).collect(), 0)
        }
        StatementKind::Next | StatementKind::Previous => {
            let anchor = match params.iter().find(|(n, _)| n == "DateCreated") {
                Some((_, Value::Timestamp(t))) => *t,
                _ => DateTime::<Utc>::MIN_UTC,
            };
            let mut sorted = rows.clone();
            sorted.sort_by_key(|r| (row_created(r), row_id(r)));
            let found = if shape == StatementKind::Next {
                sorted.into_iter().find(|r| row_created(r) > anchor)
            } else {
                sorted.into_iter().rev().find(|r| row_created(r) < anchor)
            };
            (found.into_iter().collect(), 0)
        }
        StatementKind::SortedIds => {
            let mut sorted = rows.clone();
            sorted.sort_by_key(|r| (row_created(r), row_id(r)));
            sorted.reverse();
            let pairs = sorted
                .into_iter()
                .map(|r| {
                    let mut row = Row::new();
                    row.push("id", Value::Uuid(row_id(&r)));
                    row.push("date_created", Value::Timestamp(row_created(&r)));
                    row
                })
                .collect();
            (pairs, 0)
        }
        StatementKind::TryInsert => {
            let guard_at = cmd.text().find("EXISTS (SELECT 1 FROM").unwrap_or(0);
            let guard = guard_entries(&cmd.text()[guard_at..], &params);
            if rows.iter().any(|row| matches(row, &guard, any)) {
                (Vec::new(), 0)
            } else {
                rows.push(row_from_params(&params));
                (Vec::new(), 1)
            }
        }
        StatementKind::Upsert => {
            let guard_at = cmd.text().find("WHERE").unwrap_or(0);
            let guard_end = cmd.text().find(" RETURNING").unwrap_or(cmd.text().len());
            let guard = guard_entries(&cmd.text()[guard_at..guard_end], &params);
            let mut affected = 0;
            for row in rows.iter_mut() {
                if matches(row, &guard, any) {
                    let id = row.get("id").cloned();
                    *row = row_from_params(&params);
                    // Key is never reassigned by the update branch.
                    if let Some(id) = id {
                        *row = row
                            .iter()
                            .map(|(name, value)| {
                                let value = if name == "id" { id.clone() } else { value.clone() };
                                (name.to_string(), value)
                            })
                            .collect();
                    }
                    affected += 1;
                }
            }
            if affected == 0 {
                rows.push(row_from_params(&params));
                affected = 1;
            }
            (Vec::new(), affected)
        }
    })
}
