use std::{env, error::Error, fs, path::PathBuf, str::FromStr};

use sqlx::{
    migrate::Migrator,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};

// Applies `migrations/` to a scratch database in OUT_DIR and points the
// `query!` macros at it, so statements are checked against the real schema.
fn main() -> Result<(), Box<dyn Error>> {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=migrations");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR")?);
    let db_path = PathBuf::from(env::var("OUT_DIR")?).join("schema.db");
    for suffix in ["", "-wal", "-shm"] {
        let stale = PathBuf::from(format!("{}{suffix}", db_path.display()));
        if stale.exists() {
            fs::remove_file(stale)?;
        }
    }
    let url = format!("sqlite://{}", db_path.display());

    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?
        .block_on(async {
            let options = SqliteConnectOptions::from_str(&url)?.create_if_missing(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .connect_with(options)
                .await?;
            Migrator::new(manifest_dir.join("migrations"))
                .await?
                .run(&pool)
                .await?;
            pool.close().await;
            Ok::<_, Box<dyn Error>>(())
        })?;

    println!("cargo:rustc-env=DATABASE_URL={url}");
    Ok(())
}
