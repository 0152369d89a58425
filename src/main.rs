use bazaar_client::routes::{guard, Route};
use bazaar_client::{logging, products, AppContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let ctx = AppContext::init()?;
    tracing::info!(api = %ctx.config.api_base_url, "starting");

    let store = ctx.session_store();
    let session = store.restore().await;
    tracing::info!(?session, "session restored");

    let path = std::env::args().nth(1).unwrap_or_else(|| "/products".to_string());
    let route = Route::parse(&path);
    tracing::info!(%route, decision = ?guard(&route, &store.view()), "route guard");

    let catalog = products::catalog_list(&ctx);
    catalog.mount();
    catalog.settled().await;

    let snap = catalog.snapshot();
    if let Some(error) = &snap.error {
        tracing::warn!(%error, "catalog failed to load");
    } else {
        tracing::info!(
            status = ?snap.status(),
            items = snap.items.len(),
            total = snap.total,
            page = snap.page(),
            pages = snap.total_pages(),
            "catalog loaded"
        );
        for product in &snap.items {
            tracing::debug!(id = %product.id, title = %product.title, price = product.price, "product");
        }
    }

    catalog.unmount();
    Ok(())
}
