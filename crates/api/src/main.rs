use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use shelfprice_core::dataset::Dataset;
use shelfprice_core::domain::insights::MarketInsights;
use shelfprice_core::domain::product::{DemandLevel, Product};
use shelfprice_core::insights::market_insights;
use shelfprice_core::pricing::features::FeatureVector;
use shelfprice_core::pricing::model::Predictor;
use shelfprice_core::pricing::{price_product, round2};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = shelfprice_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    // The dataset is the one artifact the process cannot run without.
    let dataset_path = settings.dataset_path();
    let dataset = Dataset::from_csv_path(std::path::Path::new(dataset_path))?;
    tracing::info!(path = %dataset_path, products = dataset.len(), "dataset loaded");

    // Predictor artifacts are optional: a failed load downgrades the process
    // to the fallback formula for its whole lifetime.
    let predictor = Predictor::load(
        std::path::Path::new(settings.model_path()),
        std::path::Path::new(settings.scaler_path()),
    );
    tracing::info!(mode = predictor.mode(), "predictor selected");

    let state = AppState {
        ctx: Arc::new(AppContext { dataset, predictor }),
    };

    let app = router(state);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(8000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/healthz", get(healthz))
        .route("/api/products", get(get_all_products))
        .route("/api/products/:product_id", get(get_product))
        .route("/api/products/category/:category", get(get_products_by_category))
        .route("/api/categories", get(get_categories))
        .route("/api/price-prediction", post(predict_price))
        .route("/api/insights", get(get_insights))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // The storefront is served from another origin.
        .layer(CorsLayer::permissive())
}

#[derive(Clone)]
struct AppState {
    ctx: Arc<AppContext>,
}

struct AppContext {
    dataset: Dataset,
    predictor: Predictor,
}

#[derive(Debug, Serialize)]
struct ServiceInfo {
    status: &'static str,
    message: &'static str,
    version: &'static str,
}

async fn root() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        status: "success",
        message: "Dynamic Pricing API is running",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    products: usize,
    predictor: &'static str,
    checked_at: String,
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        products: state.ctx.dataset.len(),
        predictor: state.ctx.predictor.mode(),
        checked_at: Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
struct ProductPricing {
    product_id: u32,
    name: String,
    category: String,
    base_price: f64,
    dynamic_price: f64,
    discount_percent: f64,
    demand_level: DemandLevel,
    demand_ratio: f64,
    stock: u32,
}

impl ProductPricing {
    fn build(ctx: &AppContext, product: &Product) -> anyhow::Result<Self> {
        let pricing = price_product(&ctx.dataset, &ctx.predictor, product)?;
        Ok(Self {
            product_id: product.product_id,
            name: product.name.clone(),
            category: product.category.clone(),
            base_price: pricing.base_price,
            dynamic_price: pricing.dynamic_price,
            discount_percent: pricing.discount_percent,
            demand_level: pricing.demand_level,
            demand_ratio: pricing.demand_ratio,
            stock: pricing.stock,
        })
    }
}

#[derive(Debug, Serialize)]
struct ProductDetail {
    #[serde(flatten)]
    pricing: ProductPricing,
    sales_7_days: u32,
    sales_30_days: u32,
}

async fn get_all_products(
    State(state): State<AppState>,
) -> Result<Json<Vec<ProductPricing>>, StatusCode> {
    let ctx = &state.ctx;
    let mut out = Vec::with_capacity(ctx.dataset.len());
    for product in ctx.dataset.all() {
        out.push(ProductPricing::build(ctx, product).map_err(internal_error)?);
    }
    Ok(Json(out))
}

async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<u32>,
) -> Result<Json<ProductDetail>, StatusCode> {
    let ctx = &state.ctx;
    let product = ctx
        .dataset
        .find_by_id(product_id)
        .ok_or(StatusCode::NOT_FOUND)?;
    let pricing = ProductPricing::build(ctx, product).map_err(internal_error)?;

    Ok(Json(ProductDetail {
        pricing,
        sales_7_days: product.sales_7,
        sales_30_days: product.sales_30,
    }))
}

async fn get_products_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Json<Vec<ProductPricing>>, StatusCode> {
    let ctx = &state.ctx;
    let products = ctx.dataset.find_by_category(&category);
    if products.is_empty() {
        return Err(StatusCode::NOT_FOUND);
    }

    let mut out = Vec::with_capacity(products.len());
    for product in products {
        out.push(ProductPricing::build(ctx, product).map_err(internal_error)?);
    }
    Ok(Json(out))
}

#[derive(Debug, Serialize)]
struct CategoriesResponse {
    categories: Vec<String>,
    total: usize,
}

async fn get_categories(State(state): State<AppState>) -> Json<CategoriesResponse> {
    let categories = state.ctx.dataset.categories();
    let total = categories.len();
    Json(CategoriesResponse { categories, total })
}

#[derive(Debug, Serialize)]
struct PricePredictionResponse {
    predicted_price: f64,
}

/// Caller-supplied features go straight to the model; the deriver is
/// bypassed. Fallback mode cannot serve this path.
async fn predict_price(
    State(state): State<AppState>,
    Json(features): Json<FeatureVector>,
) -> Result<Json<PricePredictionResponse>, StatusCode> {
    let predicted = state
        .ctx
        .predictor
        .model_price(&features)
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)?;

    Ok(Json(PricePredictionResponse {
        predicted_price: round2(predicted),
    }))
}

async fn get_insights(State(state): State<AppState>) -> Json<MarketInsights> {
    Json(market_insights(&state.ctx.dataset))
}

fn internal_error(err: anyhow::Error) -> StatusCode {
    sentry_anyhow::capture_anyhow(&err);
    tracing::error!(error = %format!("{err:#}"), "pricing computation failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &shelfprice_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
