mod common;

use axum::http::StatusCode;
use common::{parse_body, TestApp, TEST_PASSWORD};
use pestops_backend::domain::models::staff::{Role, Staff};
use serde_json::json;

struct Office {
    company_id: String,
    b1: String,
    b2: String,
    admin: String,
    tech: Staff,
    other_tech: Staff,
}

async fn office(app: &TestApp) -> Office {
    let company = app.seed_company("Acme Pest").await;
    let b1 = app.seed_branch(&company.id, "Central").await;
    let b2 = app.seed_branch(&company.id, "Harbour").await;
    app.seed_staff(Some(&company.id), None, Role::Admin, "admin@acme.test").await;
    let tech = app.seed_staff(Some(&company.id), Some(&b1.id), Role::Technician, "tech@acme.test").await;
    let other_tech = app.seed_staff(Some(&company.id), Some(&b1.id), Role::Technician, "tech2@acme.test").await;
    let admin = app.login("admin@acme.test", TEST_PASSWORD).await;
    Office {
        company_id: company.id,
        b1: b1.id,
        b2: b2.id,
        admin,
        tech,
        other_tech,
    }
}

async fn create_lead(app: &TestApp, token: &str, branch_id: &str, name: &str, assigned_to: Option<&str>) -> String {
    let res = app.post_json("/api/v1/leads", token, json!({
        "branch_id": branch_id,
        "customer_name": name,
        "mobile": "9811111111",
        "city": "Mumbai",
        "assigned_to": assigned_to,
    })).await;
    assert_eq!(res.status(), StatusCode::CREATED, "lead creation failed");
    parse_body(res).await["data"]["id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_admin_lead_lifecycle() {
    let app = TestApp::new().await;
    let o = office(&app).await;

    let lead_id = create_lead(&app, &o.admin, &o.b1, "Mrs. Sharma", Some(&o.tech.id)).await;

    let res = app.get(&format!("/api/v1/leads/{}", lead_id), &o.admin).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;
    assert_eq!(body["data"]["status"], "NEW");
    assert_eq!(body["data"]["company_id"], o.company_id.as_str());

    let res = app.patch_json(&format!("/api/v1/leads/{}", lead_id), &o.admin, json!({
        "status": "QUOTED",
        "notes": "Termite inspection booked",
    })).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;
    assert_eq!(body["data"]["status"], "QUOTED");
    assert_eq!(body["data"]["notes"], "Termite inspection booked");

    let res = app.delete(&format!("/api/v1/leads/{}", lead_id), &o.admin).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.get(&format!("/api/v1/leads/{}", lead_id), &o.admin).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_technician_sees_only_assigned_leads() {
    let app = TestApp::new().await;
    let o = office(&app).await;

    let mine = create_lead(&app, &o.admin, &o.b1, "Assigned To Me", Some(&o.tech.id)).await;
    let theirs = create_lead(&app, &o.admin, &o.b1, "Assigned Elsewhere", Some(&o.other_tech.id)).await;
    create_lead(&app, &o.admin, &o.b1, "Unassigned", None).await;

    let tech = app.login("tech@acme.test", TEST_PASSWORD).await;

    let res = app.get("/api/v1/leads", &tech).await;
    assert_eq!(res.status(), StatusCode::OK);
    let body = parse_body(res).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["id"], mine.as_str());

    let res = app.get(&format!("/api/v1/leads?assigned_to={}", o.other_tech.id), &tech).await;
    assert_eq!(parse_body(res).await["pagination"]["total"], 0);

    let res = app.get(&format!("/api/v1/leads/{}", mine), &tech).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.get(&format!("/api/v1/leads/{}", theirs), &tech).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
    assert_eq!(parse_body(res).await["message"], "You do not have permission to access this resource");

    // Technicians update their own leads but cannot hand them over or delete them
    let res = app.patch_json(&format!("/api/v1/leads/{}", mine), &tech, json!({ "status": "CONTACTED" })).await;
    assert_eq!(res.status(), StatusCode::OK);

    let res = app.patch_json(&format!("/api/v1/leads/{}", mine), &tech, json!({ "assigned_to": o.other_tech.id })).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    let res = app.delete(&format!("/api/v1/leads/{}", mine), &tech).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_area_manager_sees_only_own_branch() {
    let app = TestApp::new().await;
    let o = office(&app).await;
    app.seed_staff(Some(&o.company_id), Some(&o.b2), Role::AreaManager, "am@acme.test").await;

    create_lead(&app, &o.admin, &o.b1, "Central Customer", None).await;
    let harbour = create_lead(&app, &o.admin, &o.b2, "Harbour Customer", None).await;
    let central = create_lead(&app, &o.admin, &o.b1, "Another Central", None).await;

    let am = app.login("am@acme.test", TEST_PASSWORD).await;

    let res = app.get("/api/v1/leads", &am).await;
    let body = parse_body(res).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["id"], harbour.as_str());

    let res = app.get(&format!("/api/v1/leads?branch_id={}", o.b1), &am).await;
    assert_eq!(parse_body(res).await["pagination"]["total"], 0);

    let res = app.get(&format!("/api/v1/leads/{}", central), &am).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Creating in another branch is refused, in their own branch accepted
    let res = app.post_json("/api/v1/leads", &am, json!({
        "branch_id": o.b1,
        "customer_name": "Wrong Branch",
        "mobile": "9822222222",
    })).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    create_lead(&app, &am, &o.b2, "Walk In", None).await;
}

#[tokio::test]
async fn test_roles_without_lead_access_are_refused() {
    let app = TestApp::new().await;
    let o = office(&app).await;
    app.seed_staff(Some(&o.company_id), Some(&o.b1), Role::SalesExecutive, "sales@acme.test").await;
    let sales = app.login("sales@acme.test", TEST_PASSWORD).await;

    let res = app.get("/api/v1/leads", &sales).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_leads_of_other_companies_are_not_found() {
    let app = TestApp::new().await;
    let o = office(&app).await;
    let lead_id = create_lead(&app, &o.admin, &o.b1, "Private Customer", None).await;

    let rival = app.seed_company("Rival Pest").await;
    let rival_branch = app.seed_branch(&rival.id, "Rival HQ").await;
    app.seed_staff(Some(&rival.id), None, Role::Admin, "admin@rival.test").await;
    let rival_admin = app.login("admin@rival.test", TEST_PASSWORD).await;

    let res = app.get(&format!("/api/v1/leads/{}", lead_id), &rival_admin).await;
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let res = app.get("/api/v1/leads", &rival_admin).await;
    assert_eq!(parse_body(res).await["pagination"]["total"], 0);

    // Nor can a lead be filed against someone else's branch
    let res = app.post_json("/api/v1/leads", &o.admin, json!({
        "branch_id": rival_branch.id,
        "customer_name": "Cross Tenant",
        "mobile": "9833333333",
    })).await;
    assert_eq!(res.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_lead_list_pagination_filters_and_search() {
    let app = TestApp::new().await;
    let o = office(&app).await;

    for i in 0..12 {
        create_lead(&app, &o.admin, &o.b1, &format!("Customer {:02}", i), None).await;
    }
    let special = create_lead(&app, &o.admin, &o.b2, "Zara Mehta", None).await;
    app.patch_json(&format!("/api/v1/leads/{}", special), &o.admin, json!({ "status": "WON" })).await;

    let res = app.get("/api/v1/leads", &o.admin).await;
    let body = parse_body(res).await;
    assert_eq!(body["pagination"]["total"], 13);
    assert_eq!(body["pagination"]["limit"], 10);
    assert_eq!(body["pagination"]["total_pages"], 2);
    assert_eq!(body["data"].as_array().unwrap().len(), 10);

    let res = app.get("/api/v1/leads?page=2", &o.admin).await;
    assert_eq!(parse_body(res).await["data"].as_array().unwrap().len(), 3);

    let res = app.get("/api/v1/leads?sort_by=customer_name&order=asc&limit=3", &o.admin).await;
    let body = parse_body(res).await;
    let names: Vec<&str> = body["data"].as_array().unwrap().iter().map(|l| l["customer_name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["Customer 00", "Customer 01", "Customer 02"]);

    let res = app.get("/api/v1/leads?search=zara", &o.admin).await;
    let body = parse_body(res).await;
    assert_eq!(body["pagination"]["total"], 1);
    assert_eq!(body["data"][0]["id"], special.as_str());

    let res = app.get("/api/v1/leads?status=WON", &o.admin).await;
    assert_eq!(parse_body(res).await["pagination"]["total"], 1);

    let res = app.get(&format!("/api/v1/leads?branch_id={}", o.b1), &o.admin).await;
    assert_eq!(parse_body(res).await["pagination"]["total"], 12);

    let res = app.get("/api/v1/leads?limit=1000", &o.admin).await;
    assert_eq!(parse_body(res).await["pagination"]["limit"], 100);
}

#[tokio::test]
async fn test_lead_assignee_must_belong_to_company() {
    let app = TestApp::new().await;
    let o = office(&app).await;

    let res = app.post_json("/api/v1/leads", &o.admin, json!({
        "branch_id": o.b1,
        "customer_name": "Ghost Assignment",
        "mobile": "9844444444",
        "assigned_to": "no-such-staff",
    })).await;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
}
