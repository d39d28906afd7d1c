use std::{fs, path::Path};

use db::models::{
    review::{CreateReview, Review, UpdateReview},
    review_stats::{AggregateView, StatsView, UpdateStatsSettings},
};
use ts_rs::TS;
use utils::response::ErrorBody;

fn generate_types_content() -> String {
    let header = "// This file was generated by `cargo run --bin generate_types`.\n// Do not edit manually.\n\n";
    let decls = [
        Review::decl(),
        CreateReview::decl(),
        UpdateReview::decl(),
        StatsView::decl(),
        AggregateView::decl(),
        UpdateStatsSettings::decl(),
        ErrorBody::decl(),
    ];
    let body = decls
        .into_iter()
        .map(|d| format!("export {}", d.trim_start()))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{header}{body}\n")
}

fn main() -> std::io::Result<()> {
    let shared = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../shared");
    fs::create_dir_all(&shared)?;

    let path = shared.join("types.ts");
    fs::write(&path, generate_types_content())?;
    println!("Wrote {}", path.display());
    Ok(())
}
