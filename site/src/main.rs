//! Storefront server binary: loads configuration, spawns the price feed
//! and serves the routes.

mod conf;
mod pages;
mod routes;
mod session;

use {
    crate::{
        conf::SiteConf,
        pages::Pages,
        routes::{routes, SiteContext},
        session::SessionStore,
    },
    anyhow::Result as AnyResult,
    std::{net::SocketAddr, sync::Arc},
    webbook_sdk::{
        access::{AccessClient, SecretGate},
        price::{PriceClient, PriceFeed, PRICE_REFRESH_INTERVAL},
        verify::VerificationClient,
    },
};

#[tokio::main]
async fn main() {
    env_logger::init();

    if let Err(e) = run().await {
        eprintln!("✘ {}", e);

        std::process::exit(1);
    }
}

async fn run() -> AnyResult<()> {
    // A missing config file is not an error; the defaults serve a local
    // development setup.
    let conf = match SiteConf::load().await {
        Ok(conf) => conf,
        Err(e) => {
            log::warn!("No site config loaded ({}), using defaults", e);
            SiteConf::default()
        }
    }
    .with_env_overrides();

    let addr: SocketAddr = format!("{}:{}", conf.listen.addr, conf.listen.port).parse()?;

    let price_client = PriceClient::new(conf.backend.price_base_url.as_deref());
    let (price, _price_task) = PriceFeed::spawn(
        price_client,
        conf.book.asset_id.clone(),
        PRICE_REFRESH_INTERVAL,
    );

    let ctx = SiteContext {
        verify: Arc::new(VerificationClient::new(Some(&conf.backend.verify_base_url))),
        access: Arc::new(AccessClient::new(Some(&conf.backend.access_base_url))),
        gate: SecretGate::new(conf.backend.passphrase.clone()),
        pages: Arc::new(Pages::new()),
        sessions: SessionStore::new(),
        price,
        conf: Arc::new(conf),
    };

    log::info!("Serving the storefront on http://{}", addr);

    warp::serve(routes(ctx)).run(addr).await;

    Ok(())
}
