//! HTTP surface: admin form endpoints and the public read API.

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    response::Json,
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::cache;
use crate::cms::Cms;
use crate::config::Settings;
use crate::error::CmsError;
use crate::forms::FormState;
use crate::hierarchy::ParentOption;
use crate::models::{
    CarouselSlide, FeaturedItem, FooterContent, HeroSlide, HomePage, NavigationRecord,
    PopulatedNavItem, ValuePropositionItem, DEFAULT_FOOTER,
};
use crate::sections::featured::FeaturedItemForm;
use crate::sections::footer::FooterForm;
use crate::sections::hero::HeroSlideForm;
use crate::sections::navigation::{NavigationForm, ReorderEntry};
use crate::sections::value_props::ValuePropositionForm;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub cms: Cms,
    pub settings: Settings,
}

type ApiResult<T> = Result<Json<T>, CmsError>;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Admin
        .route("/admin/revalidate", post(revalidate_all))
        .route(
            "/admin/navigation",
            get(admin_navigation).post(save_navigation_item),
        )
        .route("/admin/navigation/parent-options", get(parent_options))
        .route("/admin/navigation/reorder", post(reorder_navigation))
        .route(
            "/admin/navigation/:id",
            get(get_navigation_item).delete(delete_navigation_item),
        )
        .route(
            "/admin/hero-slides",
            get(admin_hero_slides).post(save_hero_slide),
        )
        .route(
            "/admin/hero-slides/:id",
            get(get_hero_slide).delete(delete_hero_slide),
        )
        .route(
            "/admin/featured-items",
            get(admin_featured_items).post(save_featured_item),
        )
        .route(
            "/admin/featured-items/:id",
            get(get_featured_item).delete(delete_featured_item),
        )
        .route(
            "/admin/value-propositions",
            get(admin_value_propositions).post(save_value_proposition),
        )
        .route(
            "/admin/value-propositions/:id",
            get(get_value_proposition).delete(delete_value_proposition),
        )
        .route("/admin/footer", post(save_footer))
        .route("/admin/footer/:identifier", get(admin_footer))
        // Public
        .route("/api/home", get(home))
        .route("/api/navigation", get(public_navigation))
        .route("/api/hero-slides", get(public_hero_slides))
        .route("/api/hero-slides/:id", get(public_hero_slide))
        .route("/api/featured-items", get(public_featured_items))
        .route("/api/value-propositions", get(public_value_propositions))
        .route("/api/footer", get(public_default_footer))
        .route("/api/footer/:identifier", get(public_footer))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint.
async fn health() -> &'static str {
    "ok"
}

/// Drop every cached public entry.
async fn revalidate_all(State(state): State<AppState>) -> Json<Value> {
    let dropped = state.cms.cache().invalidate(cache::CONTENT);
    info!("Full revalidation: {} cached entries dropped", dropped);
    Json(json!({ "success": true, "dropped": dropped }))
}

// --- Navigation -------------------------------------------------------------

async fn admin_navigation(State(state): State<AppState>) -> ApiResult<Vec<PopulatedNavItem>> {
    Ok(Json(state.cms.admin_navigation().await?))
}

async fn get_navigation_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<NavigationRecord> {
    Ok(Json(state.cms.navigation_item(&id).await?))
}

#[derive(Deserialize)]
struct ParentOptionsQuery {
    exclude: Option<String>,
}

async fn parent_options(
    State(state): State<AppState>,
    Query(query): Query<ParentOptionsQuery>,
) -> ApiResult<Vec<ParentOption>> {
    let exclude = query.exclude.as_deref().filter(|e| !e.is_empty());
    Ok(Json(state.cms.navigation_parent_options(exclude).await?))
}

async fn save_navigation_item(
    State(state): State<AppState>,
    Form(form): Form<NavigationForm>,
) -> ApiResult<FormState<NavigationRecord>> {
    Ok(Json(state.cms.upsert_navigation_item(form).await?))
}

async fn delete_navigation_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<FormState<()>> {
    Ok(Json(state.cms.delete_navigation_item(&id).await?))
}

async fn reorder_navigation(
    State(state): State<AppState>,
    Json(entries): Json<Vec<ReorderEntry>>,
) -> ApiResult<FormState<()>> {
    Ok(Json(state.cms.reorder_navigation_items(entries).await?))
}

// --- Hero slides ------------------------------------------------------------

async fn admin_hero_slides(State(state): State<AppState>) -> ApiResult<Vec<HeroSlide>> {
    Ok(Json(state.cms.admin_hero_slides().await?))
}

async fn get_hero_slide(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<HeroSlide> {
    Ok(Json(state.cms.hero_slide(&id).await?))
}

async fn save_hero_slide(
    State(state): State<AppState>,
    Form(form): Form<HeroSlideForm>,
) -> ApiResult<FormState<HeroSlide>> {
    Ok(Json(state.cms.upsert_hero_slide(form).await?))
}

async fn delete_hero_slide(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<FormState<()>> {
    Ok(Json(state.cms.delete_hero_slide(&id).await?))
}

// --- Featured items ---------------------------------------------------------

async fn admin_featured_items(State(state): State<AppState>) -> ApiResult<Vec<FeaturedItem>> {
    Ok(Json(state.cms.admin_featured_items().await?))
}

async fn get_featured_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<FeaturedItem> {
    Ok(Json(state.cms.featured_item(&id).await?))
}

async fn save_featured_item(
    State(state): State<AppState>,
    Form(form): Form<FeaturedItemForm>,
) -> ApiResult<FormState<FeaturedItem>> {
    Ok(Json(state.cms.upsert_featured_item(form).await?))
}

async fn delete_featured_item(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<FormState<()>> {
    Ok(Json(state.cms.delete_featured_item(&id).await?))
}

// --- Value propositions -----------------------------------------------------

async fn admin_value_propositions(
    State(state): State<AppState>,
) -> ApiResult<Vec<ValuePropositionItem>> {
    Ok(Json(state.cms.admin_value_propositions().await?))
}

async fn get_value_proposition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<ValuePropositionItem> {
    Ok(Json(state.cms.value_proposition(&id).await?))
}

async fn save_value_proposition(
    State(state): State<AppState>,
    Form(form): Form<ValuePropositionForm>,
) -> ApiResult<FormState<ValuePropositionItem>> {
    Ok(Json(state.cms.upsert_value_proposition(form).await?))
}

async fn delete_value_proposition(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<FormState<()>> {
    Ok(Json(state.cms.delete_value_proposition(&id).await?))
}

// --- Footer -----------------------------------------------------------------

async fn admin_footer(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> ApiResult<FooterContent> {
    state
        .cms
        .admin_footer(&identifier)
        .await?
        .map(Json)
        .ok_or_else(|| CmsError::not_found("Footer", identifier))
}

async fn save_footer(
    State(state): State<AppState>,
    Form(form): Form<FooterForm>,
) -> ApiResult<FormState<FooterContent>> {
    Ok(Json(state.cms.upsert_footer(form).await?))
}

// --- Public -----------------------------------------------------------------

async fn home(State(state): State<AppState>) -> ApiResult<HomePage> {
    Ok(Json(state.cms.home_page(state.settings.nav_max_depth).await?))
}

#[derive(Deserialize)]
struct NavigationQuery {
    max_depth: Option<usize>,
}

async fn public_navigation(
    State(state): State<AppState>,
    query: Result<Query<NavigationQuery>, QueryRejection>,
) -> ApiResult<Vec<PopulatedNavItem>> {
    let Query(query) = query.map_err(|rejection| {
        debug!("Bad navigation query: {}", rejection);
        CmsError::field("max_depth", "max_depth must be a non-negative integer.")
    })?;
    let depth = query.max_depth.unwrap_or(state.settings.nav_max_depth);
    Ok(Json(state.cms.navigation(Some(depth)).await?))
}

async fn public_hero_slides(State(state): State<AppState>) -> ApiResult<Vec<CarouselSlide>> {
    Ok(Json(state.cms.published_hero_slides().await?))
}

async fn public_hero_slide(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CarouselSlide> {
    state
        .cms
        .published_hero_slide(&id)
        .await?
        .map(Json)
        .ok_or_else(|| CmsError::not_found("Hero slide", id))
}

async fn public_featured_items(State(state): State<AppState>) -> ApiResult<Vec<FeaturedItem>> {
    Ok(Json(state.cms.published_featured_items().await?))
}

async fn public_value_propositions(
    State(state): State<AppState>,
) -> ApiResult<Vec<ValuePropositionItem>> {
    Ok(Json(state.cms.published_value_propositions().await?))
}

/// Published footer, or `null` when there is none to show.
async fn public_default_footer(State(state): State<AppState>) -> ApiResult<Option<FooterContent>> {
    Ok(Json(state.cms.footer(DEFAULT_FOOTER).await?))
}

async fn public_footer(
    State(state): State<AppState>,
    Path(identifier): Path<String>,
) -> ApiResult<Option<FooterContent>> {
    Ok(Json(state.cms.footer(&identifier).await?))
}

#[cfg(test)]
mod tests {
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use tower::ServiceExt;

    use super::*;
    use crate::cms::testing::cms;

    fn app() -> Router {
        let settings = Settings::from_lookup(|_| None).unwrap();
        router(AppState {
            cms: cms(),
            settings,
        })
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn delete(uri: &str) -> Request<Body> {
        Request::builder()
            .method("DELETE")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = send(&app(), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Value::String("ok".into()));
    }

    #[tokio::test]
    async fn test_navigation_flow() {
        let app = app();
        let (status, body) =
            send(&app, post_form("/admin/navigation", "label=Products&href=%2Fproducts&order=1")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["message"], "Navigation item \"Products\" created successfully!");
        let parent = body["item"]["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            post_form(
                "/admin/navigation",
                &format!("label=Widgets&href=%2Fwidgets&parent_id={}", parent),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (_, forest) = send(&app, get("/api/navigation")).await;
        assert_eq!(forest.as_array().unwrap().len(), 1);
        assert_eq!(forest[0]["label"], "Products");
        assert_eq!(forest[0]["children"][0]["label"], "Widgets");

        let (_, shallow) = send(&app, get("/api/navigation?max_depth=0")).await;
        assert_eq!(shallow[0]["children"], json!([]));

        let (_, options) = send(
            &app,
            get(&format!("/admin/navigation/parent-options?exclude={}", parent)),
        )
        .await;
        assert_eq!(options, json!([]));

        let (status, _) = send(&app, delete(&format!("/admin/navigation/{}", parent))).await;
        assert_eq!(status, StatusCode::OK);
        let (_, forest) = send(&app, get("/admin/navigation")).await;
        assert_eq!(forest, json!([]));
    }

    #[tokio::test]
    async fn test_bad_max_depth_gets_form_state_envelope() {
        let app = app();
        for uri in ["/api/navigation?max_depth=abc", "/api/navigation?max_depth=-1"] {
            let (status, body) = send(&app, get(uri)).await;
            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
            assert_eq!(body["success"], false);
            assert_eq!(
                body["field_errors"]["max_depth"][0],
                "max_depth must be a non-negative integer."
            );
        }
        let (status, _) = send(&app, get("/api/navigation?max_depth=2")).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_validation_error_response() {
        let (status, body) = send(&app(), post_form("/admin/navigation", "label=&href=")).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["success"], false);
        assert_eq!(body["field_errors"]["label"][0], "Label is required.");
        assert_eq!(body["field_errors"]["href"][0], "Link/Href is required.");
    }

    #[tokio::test]
    async fn test_reorder_cycle_rejected() {
        let app = app();
        let (_, a) = send(&app, post_form("/admin/navigation", "label=A&href=%2Fa")).await;
        let a = a["item"]["id"].as_str().unwrap().to_string();
        let (_, b) = send(
            &app,
            post_form("/admin/navigation", &format!("label=B&href=%2Fb&parent_id={}", a)),
        )
        .await;
        let b = b["item"]["id"].as_str().unwrap().to_string();

        let (status, body) = send(
            &app,
            post_json(
                "/admin/navigation/reorder",
                json!([{ "id": a, "order": 0, "parent_id": b }]),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert!(body["field_errors"]["parent_id"].is_array());
    }

    #[tokio::test]
    async fn test_missing_records_are_404() {
        let app = app();
        let (status, _) = send(&app, get("/admin/hero-slides/hero_missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, delete("/admin/featured-items/feat_missing")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = send(&app, get("/admin/footer/main_footer")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_home_page_reflects_writes() {
        let app = app();
        let (_, home) = send(&app, get("/api/home")).await;
        assert_eq!(home["hero_slides"], json!([]));
        assert!(home["footer"].is_null());

        send(&app, post_form("/admin/hero-slides", "title=Launch&published=on&image_url=")).await;
        send(
            &app,
            post_form("/admin/footer", "copyright_text=%C2%A9+Acme&published=on"),
        )
        .await;
        send(
            &app,
            post_form(
                "/admin/value-propositions",
                "title=Fast&published=on&link_url=https%3A%2F%2Fexample.com",
            ),
        )
        .await;

        let (status, home) = send(&app, get("/api/home")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(home["hero_slides"][0]["title"], "Launch");
        assert!(home["hero_slides"][0]["image_url"].is_null());
        assert_eq!(home["footer"]["copyright_text"], "© Acme");
        assert_eq!(home["value_propositions"][0]["title"], "Fast");
    }

    #[tokio::test]
    async fn test_revalidate_drops_cached_entries() {
        let app = app();
        send(&app, get("/api/hero-slides")).await;
        send(&app, get("/api/featured-items")).await;
        let (status, body) = send(
            &app,
            Request::builder()
                .method("POST")
                .uri("/admin/revalidate")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["dropped"], 2);
    }
}
