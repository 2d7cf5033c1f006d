use crate::config::AppConfig;
use crate::entities::{customer, order, product};
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema,
};
use std::time::Duration;
use tracing::{debug, info};

/// Type alias for a database connection pool
pub type DbPool = DatabaseConnection;

/// Establishes a connection pool using pool settings from config.
pub async fn establish_connection(config: &AppConfig) -> Result<DbPool, DbErr> {
    debug!(url = %config.database_url, "Configuring database connection");

    let mut opt = ConnectOptions::new(config.database_url.clone());
    opt.max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .connect_timeout(Duration::from_secs(config.db_connect_timeout_secs))
        .sqlx_logging(false);

    let pool = Database::connect(opt).await?;
    info!(
        max_connections = config.db_max_connections,
        "Database connection established"
    );
    Ok(pool)
}

/// Creates missing tables from the entity definitions. Uniqueness
/// constraints (customers.email, products.slug) come from the entity
/// column attributes, so every backend enforces them at the storage
/// layer.
pub async fn run_migrations(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut statements = vec![
        schema.create_table_from_entity(product::Entity),
        schema.create_table_from_entity(customer::Entity),
        schema.create_table_from_entity(order::Entity),
    ];

    for stmt in statements.iter_mut() {
        stmt.if_not_exists();
        db.execute(backend.build(&*stmt)).await?;
    }

    info!("Schema migrations applied");
    Ok(())
}
