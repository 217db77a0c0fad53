mod common;

use common::{body_of, dispatcher, entries, journal, json_of, xhr};
use oxide_mvc::{
    ControllerError, ControllerOutcome, Context, Controller, Dispatcher, Flow, Request,
    RequestContext, RouterError, UploadedFile, View,
};
use serde_json::json;

#[test]
fn test_first_registered_route_wins() {
    let log = journal();
    let d = dispatcher(&log);

    let res = d.handle(Request::get("/users/new"));
    assert_eq!(res.status, 200);
    assert_eq!(body_of(&res), "<form></form>");

    let res = d.handle(Request::get("/users/12"));
    assert_eq!(body_of(&res), "<h1>User 12</h1>");
}

#[test]
fn test_overlapping_routes_follow_registration_order() {
    let log = journal();
    let d = common::builder(&log)
        .route("/late/:id", "admin/Users")
        .route("/late/new", "admin/UserNew")
        .build()
        .unwrap();

    let res = d.handle(xhr(Request::get("/late/new")));
    assert_eq!(
        json_of(&res),
        json!({"success": false, "message": "Wrong type: id", "code": 6})
    );
}

#[test]
fn test_content_negotiation() {
    let log = journal();
    let d = dispatcher(&log);

    let page = d.handle(Request::get("/users/3"));
    assert_eq!(page.headers.get("Content-Type"), Some("text/html; charset=utf-8"));
    assert_eq!(body_of(&page), "<h1>User 3</h1>");

    let api = d.handle(xhr(Request::get("/users/3")));
    assert_eq!(api.status, 200);
    assert_eq!(api.headers.get("Access-Control-Allow-Origin"), Some("*"));
    assert_eq!(
        api.headers.get("Content-Type"),
        Some("application/json; charset=utf-8")
    );
    assert_eq!(json_of(&api), json!({"success": true, "data": {"id": 3}}));
}

#[test]
fn test_missing_required_param() {
    let log = journal();
    let d = dispatcher(&log);

    let outcome = d.run(RequestContext::new("GET", "/users").xhr());
    assert!(matches!(
        outcome.error(),
        Some(ControllerError::Params(err)) if err.key() == "id"
    ));
    let res = outcome.response();
    assert_eq!(res.status, 500);
    assert_eq!(
        json_of(res),
        json!({"success": false, "message": "Param is required: id", "code": 6})
    );

    let page = d.handle(Request::get("/users"));
    assert_eq!(page.status, 404);
    assert_eq!(body_of(&page), "<h1>Not Found</h1>");

    assert!(!entries(&log).iter().any(|e| e.starts_with("users:")));
}

#[test]
fn test_query_string_satisfies_param() {
    let log = journal();
    let d = dispatcher(&log);

    let res = d.handle(xhr(Request::get("/users?id=8")));
    assert_eq!(json_of(&res), json!({"success": true, "data": {"id": 8}}));

    let res = d.handle(xhr(Request::get("/users").query_param("id", "9")));
    assert_eq!(json_of(&res), json!({"success": true, "data": {"id": 9}}));
}

#[test]
fn test_path_params_override_query() {
    let log = journal();
    let d = dispatcher(&log);
    let res = d.handle(xhr(Request::get("/users/4?id=99")));
    assert_eq!(json_of(&res), json!({"success": true, "data": {"id": 4}}));
}

#[test]
fn test_not_found_in_both_modes() {
    let log = journal();
    let d = dispatcher(&log);

    let page = d.handle(Request::get("/nowhere"));
    assert_eq!(page.status, 404);
    assert_eq!(page.status_line(), "HTTP/1.0 404 Not Found");
    assert_eq!(body_of(&page), "<h1>Not Found: /nowhere</h1>");

    let api = d.handle(xhr(Request::get("/nowhere")));
    assert_eq!(api.status, 404);
    assert_eq!(
        json_of(&api),
        json!({"success": false, "message": "Invalid endpoint: /nowhere", "code": -1})
    );
}

#[test]
fn test_unregistered_target_is_not_found() {
    let log = journal();
    let d = dispatcher(&log);
    let res = d.handle(xhr(Request::get("/ghost")));
    assert_eq!(res.status, 404);
    assert_eq!(json_of(&res)["message"], "Invalid endpoint: /ghost");
}

#[test]
fn test_unmapped_verb_is_not_found() {
    let log = journal();
    let d = dispatcher(&log);
    let res = d.handle(Request::new("PATCH", "/users/1"));
    assert_eq!(res.status, 404);
}

#[test]
fn test_options_preflight() {
    let log = journal();
    let d = dispatcher(&log);

    let outcome = d.run(
        RequestContext::new("OPTIONS", "/users/1")
            .with_header("Origin", "https://app.example")
            .with_header("X-Custom", "1"),
    );
    let ControllerOutcome::Terminal(res) = outcome else {
        panic!("preflight must be terminal");
    };
    assert!(res.body.is_empty());
    assert_eq!(res.headers.get("Access-Control-Allow-Origin"), Some("*"));
    assert_eq!(
        res.headers.get("Access-Control-Allow-Methods"),
        Some("GET, POST, PUT, DELETE, OPTIONS")
    );
    assert_eq!(res.headers.get("Access-Control-Max-Age"), Some("604800"));
    assert_eq!(
        res.headers.get("Access-Control-Allow-Headers"),
        Some("Origin, X-Custom, Access-Control-Allow-Origin")
    );

    let log = entries(&log);
    assert_eq!(log, vec!["pre:/users/1".to_string()]);
}

#[test]
fn test_init_failure_never_runs() {
    let log = journal();
    let d = dispatcher(&log);

    let res = d.handle(Request::get("/broken"));
    assert_eq!(res.status, 403);
    assert_eq!(body_of(&res), "<p class=\"error\">Session expired</p>");

    let res = d.handle(xhr(Request::get("/broken")));
    assert_eq!(res.status, 403);
    assert_eq!(
        json_of(&res),
        json!({"success": false, "message": "Session expired", "code": -1})
    );

    let log = entries(&log);
    assert_eq!(log.iter().filter(|e| *e == "broken:init").count(), 2);
    assert!(!log.contains(&"broken:run".to_string()));
}

#[test]
fn test_mutator_redirects() {
    let log = journal();
    let d = dispatcher(&log);

    let res = d.handle(
        Request::post("/users")
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body("name=alice"),
    );
    assert_eq!(res.status, 302);
    assert_eq!(res.headers.get("Location"), Some("/users/5"));

    let outcome = d.run(RequestContext::new("POST", "/users").with_param("name", "taken"));
    assert!(matches!(
        outcome.error(),
        Some(ControllerError::Halt { code: 9, .. })
    ));
    assert_eq!(outcome.response().status, 302);
    assert_eq!(
        outcome.response().headers.get("Location"),
        Some("/users/new?error=1")
    );
}

#[test]
fn test_non_mutator_rejected_for_delete() {
    let log = journal();
    let d = dispatcher(&log);

    let outcome = d.run(RequestContext::new("DELETE", "/users/1"));
    assert!(matches!(
        outcome.error(),
        Some(ControllerError::Router(RouterError::NotMutator(name))) if name == "UsersDeleteController"
    ));
    assert_eq!(outcome.response().status, 500);
}

#[test]
fn test_non_mutator_rejected_with_json_envelope() {
    let log = journal();
    let d = dispatcher(&log);

    let res = d.handle(xhr(Request::new("DELETE", "/users/1")));
    assert_eq!(res.status, 500);
    assert_eq!(res.headers.get("Access-Control-Allow-Origin"), Some("*"));
    let body = json_of(&res);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["code"], json!(5));
    assert!(body["message"]
        .as_str()
        .is_some_and(|m| m.contains("UsersDeleteController")));
}

#[test]
fn test_put_without_controller_is_not_found() {
    let log = journal();
    let d = dispatcher(&log);
    assert_eq!(d.handle(Request::new("PUT", "/users/1")).status, 404);
}

#[test]
fn test_widget_assets_merged_once() {
    let log = journal();
    let d = dispatcher(&log);

    let res = d.handle(Request::get("/dashboard"));
    let html = body_of(&res);
    assert_eq!(res.status, 200);
    assert_eq!(html.matches("chart.css").count(), 1);
    assert_eq!(html.matches("table.css").count(), 1);
    assert_eq!(html.matches("chart.js").count(), 1);

    let head_end = html.find("</head>").unwrap();
    assert!(html.find("chart.css").unwrap() < head_end);
    assert!(html.find("chart.css").unwrap() < html.find("table.css").unwrap());
    assert!(html.find("chart.js").unwrap() > html.find("<table>").unwrap());

    let again = body_of(&d.handle(Request::get("/dashboard/")));
    assert_eq!(again, html);
}

#[test]
fn test_greedy_capture_with_forced_json() {
    let log = journal();
    let d = dispatcher(&log);
    let res = d.handle(Request::get("/files/docs/2024/report%20final.pdf"));
    assert_eq!(
        json_of(&res),
        json!({"success": true, "data": ["docs", "2024", "report final.pdf"]})
    );
}

#[test]
fn test_hooks_fire_around_dispatch() {
    let log = journal();
    let d = dispatcher(&log);

    d.handle(Request::get("/users/1"));
    d.handle(Request::get("/nowhere"));

    assert_eq!(
        entries(&log),
        vec![
            "pre:/users/1",
            "users:init",
            "users:run",
            "post:/users/1",
            "pre:/nowhere",
            "post:/nowhere",
        ]
    );
}

#[test]
fn test_mount_path_is_stripped() {
    let log = journal();
    let d = common::builder(&log).mount_path("/app").build().unwrap();
    let res = d.handle(Request::get("/app/users/2"));
    assert_eq!(body_of(&res), "<h1>User 2</h1>");
}

#[test]
fn test_unknown_hook_aborts_build() {
    let log = journal();
    let err = common::builder(&log).on_event("pre", "missing").build().unwrap_err();
    assert!(matches!(err, RouterError::UnknownHook(id) if id == "missing"));
}

#[derive(Default)]
struct UploadPostController {
    size: usize,
}

impl Controller for UploadPostController {
    fn params(&self) -> oxide_mvc::ParamSpec {
        oxide_mvc::ParamSpec::declared([oxide_mvc::ParamDescriptor::file("avatar")])
    }

    fn run(&mut self, ctx: &Context<'_>) -> Result<Flow, ControllerError> {
        self.size = ctx.params().file("avatar").map_or(0, UploadedFile::size);
        Ok(Flow::Continue)
    }

    fn render(&self, _ctx: &Context<'_>) -> Result<View, ControllerError> {
        Ok(View::Html(self.size.to_string()))
    }
}

impl oxide_mvc::Mutator for UploadPostController {}

#[test]
fn test_uploaded_file_binding() {
    let d = Dispatcher::builder()
        .route("/avatar", "Upload")
        .mutator::<UploadPostController>("UploadPost")
        .build()
        .unwrap();

    let res = d.handle(
        Request::post("/avatar").file(UploadedFile::new("avatar", "a.png", "image/png", vec![0; 16])),
    );
    assert_eq!(body_of(&res), "16");
}
