#![forbid(unsafe_code)]

const CORE_SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS meta (
          key TEXT PRIMARY KEY,
          value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS workspaces (
          workspace TEXT PRIMARY KEY,
          broken_layout INTEGER NOT NULL DEFAULT 0,
          created_at_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS counters (
          workspace TEXT NOT NULL,
          name TEXT NOT NULL,
          value INTEGER NOT NULL,
          PRIMARY KEY (workspace, name)
        );
"#;

const GRAPH_SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS containers (
          workspace TEXT NOT NULL,
          id TEXT NOT NULL,
          kind TEXT NOT NULL,
          title TEXT NOT NULL,
          external_entity TEXT,
          external_parent TEXT,
          state TEXT NOT NULL,
          pos_x REAL,
          pos_y REAL,
          width REAL NOT NULL,
          height REAL NOT NULL,
          layout TEXT NOT NULL,
          parent TEXT,
          PRIMARY KEY (workspace, id),
          CHECK ((state = 'ghost') = (pos_x IS NULL)),
          CHECK ((pos_x IS NULL) = (pos_y IS NULL))
        );

        CREATE TABLE IF NOT EXISTS ports (
          workspace TEXT NOT NULL,
          container TEXT NOT NULL,
          side TEXT NOT NULL,
          PRIMARY KEY (workspace, container, side),
          FOREIGN KEY (workspace, container)
            REFERENCES containers(workspace, id)
        );

        CREATE TABLE IF NOT EXISTS nodes (
          workspace TEXT NOT NULL,
          id TEXT NOT NULL,
          from_container TEXT NOT NULL,
          from_side TEXT NOT NULL,
          to_container TEXT NOT NULL,
          to_side TEXT NOT NULL,
          origin TEXT NOT NULL,
          PRIMARY KEY (workspace, id),
          FOREIGN KEY (workspace, from_container, from_side)
            REFERENCES ports(workspace, container, side),
          FOREIGN KEY (workspace, to_container, to_side)
            REFERENCES ports(workspace, container, side)
        );

        CREATE TABLE IF NOT EXISTS canvas_locks (
          workspace TEXT PRIMARY KEY,
          holder TEXT NOT NULL,
          issued_at_ms INTEGER NOT NULL
        );
"#;

const HISTORY_SQL: &str = r#"

        CREATE TABLE IF NOT EXISTS plan_history (
          seq INTEGER PRIMARY KEY AUTOINCREMENT,
          workspace TEXT NOT NULL,
          plan_id TEXT NOT NULL,
          applied_json TEXT NOT NULL,
          inverse_json TEXT NOT NULL,
          ts_ms INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS events (
          seq INTEGER PRIMARY KEY AUTOINCREMENT,
          workspace TEXT NOT NULL,
          ts_ms INTEGER NOT NULL,
          type TEXT NOT NULL,
          payload_json TEXT NOT NULL
        );
"#;

const INDEXES_SQL: &str = r#"

        CREATE INDEX IF NOT EXISTS idx_containers_parent
          ON containers(workspace, parent);
        CREATE INDEX IF NOT EXISTS idx_containers_external
          ON containers(workspace, external_entity);
        CREATE INDEX IF NOT EXISTS idx_nodes_from
          ON nodes(workspace, from_container);
        CREATE INDEX IF NOT EXISTS idx_nodes_to
          ON nodes(workspace, to_container);
        CREATE INDEX IF NOT EXISTS idx_history_workspace
          ON plan_history(workspace, seq);
        CREATE INDEX IF NOT EXISTS idx_events_workspace
          ON events(workspace, seq);
"#;

pub(super) fn full_schema_sql() -> String {
    let mut sql = String::new();
    sql.push_str(CORE_SQL);
    sql.push_str(GRAPH_SQL);
    sql.push_str(HISTORY_SQL);
    sql.push_str(INDEXES_SQL);
    sql
}
