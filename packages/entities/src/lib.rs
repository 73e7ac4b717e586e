//! SeaORM entities for the movie tracker schema.
//!
//! The tables themselves are created by the `migration` crate; these
//! definitions only describe them to the data-access runtime.

use sea_orm::EntityName;

pub mod movie_history;
pub mod users;
pub mod watchlist;

pub use movie_history::Entity as MovieHistories;
pub use movie_history::Model as MovieHistory;
pub use users::Entity as Users;
pub use users::Model as User;
pub use watchlist::Entity as Watchlists;
pub use watchlist::Model as Watchlist;

/// Reference to an entity managed by a database connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaEntity {
    /// Logical entity name, e.g. `MovieHistory`.
    pub name: &'static str,
    /// Backing table, read from the entity definition.
    pub table_name: String,
}

impl SchemaEntity {
    pub fn of<E>(name: &'static str) -> Self
    where
        E: EntityName + Default,
    {
        Self {
            name,
            table_name: E::default().table_name().to_string(),
        }
    }
}

/// The entities this deployment manages, in declaration order.
pub fn schema_entities() -> Vec<SchemaEntity> {
    vec![
        SchemaEntity::of::<Users>("User"),
        SchemaEntity::of::<MovieHistories>("MovieHistory"),
        SchemaEntity::of::<Watchlists>("Watchlist"),
    ]
}
