//! Schema migrations for the post store.

pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_feed_tables;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20250101_000001_create_feed_tables::Migration)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrations_are_registered_in_order() {
        let names: Vec<String> = Migrator::migrations()
            .iter()
            .map(|migration| migration.name().to_string())
            .collect();

        assert_eq!(names, vec!["m20250101_000001_create_feed_tables"]);
    }
}
