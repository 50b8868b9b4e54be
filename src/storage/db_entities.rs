//! SeaORM entity models used by the database storage backend.
//!
//! These structs map to the SQLite tables shared with the collector:
//! - `Application`: one row per observed program, `name` is unique
//! - `Session`: one row per recorded traffic window

/// Application table entity model.
pub mod application {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "Application")]
    pub struct Model {
        /// Auto-increment row id
        #[sea_orm(primary_key)]
        pub id: i64,
        /// Unique display name
        #[sea_orm(unique)]
        pub name: String,
        /// Display color, empty or NULL when unset
        #[sea_orm(column_name = "colorHex")]
        pub color_hex: Option<String>,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        /// Owns its sessions
        #[sea_orm(has_many = "super::session::Entity")]
        Session,
    }

    impl Related<super::session::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Session.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}

/// Session table entity model.
///
/// Counters are stored as signed 64-bit integers, which is what SQLite offers.
pub mod session {
    use sea_orm::entity::prelude::*;

    #[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
    #[sea_orm(table_name = "Session")]
    pub struct Model {
        /// The collector's schema declares no key; rows are addressed by SQLite's rowid.
        #[sea_orm(primary_key, column_name = "rowid")]
        pub id: i64,
        /// Epoch milliseconds
        pub start: i64,
        #[sea_orm(column_name = "durationSec")]
        pub duration_sec: i64,
        /// Foreign key to `Application.id`
        #[sea_orm(column_name = "applicationId")]
        pub application_id: i64,
        #[sea_orm(column_name = "bytesTx")]
        pub bytes_tx: i64,
        #[sea_orm(column_name = "bytesRx")]
        pub bytes_rx: i64,
        #[sea_orm(column_name = "pktTx")]
        pub pkt_tx: i64,
        #[sea_orm(column_name = "pktRx")]
        pub pkt_rx: i64,
        #[sea_orm(column_name = "pktTcp")]
        pub pkt_tcp: i64,
        #[sea_orm(column_name = "pktUdp")]
        pub pkt_udp: i64,
    }

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {
        /// Belongs to an application
        #[sea_orm(
            belongs_to = "super::application::Entity",
            from = "Column::ApplicationId",
            to = "super::application::Column::Id"
        )]
        Application,
    }

    impl Related<super::application::Entity> for Entity {
        fn to() -> RelationDef {
            Relation::Application.def()
        }
    }

    impl ActiveModelBehavior for ActiveModel {}
}
