//! LocalRepository under concurrent use, plus cross-entity cascades.

use std::collections::HashSet;
use std::sync::Arc;

use buildtrack::api::{ProjectId, User, UserId};
use buildtrack::db::{
    BudgetRepository, LocalRepository, ProjectRepository, SupplierInvoiceRepository,
};
use buildtrack::routes::budget::GetBudgetsInput;
use buildtrack::routes::supplier_invoice::{GetSupplierInvoicesInput, SupplierInvoiceFields};
use chrono::Utc;

fn user(id: &str, email: Option<&str>) -> User {
    User {
        id: UserId::new(id),
        name: Some(id.to_string()),
        email: email.map(str::to_string),
        image: None,
    }
}

async fn project(repo: &LocalRepository) -> ProjectId {
    repo.upsert_user(&user("owner", Some("owner@site.test"))).await.unwrap();
    repo.create_project("Depot", &UserId::new("owner")).await.unwrap().id
}

#[tokio::test]
async fn test_concurrent_budgets_get_unique_cost_codes() {
    let repo = Arc::new(LocalRepository::new());
    let project_id = project(&repo).await;

    let handles: Vec<_> = (0..20)
        .map(|i| {
            let repo = repo.clone();
            let project_id = project_id.clone();
            tokio::spawn(async move {
                repo.create_budget(&project_id, &format!("Line {}", i), 100.0, 1.0, &UserId::new("owner"))
                    .await
                    .unwrap()
                    .cost_code
            })
        })
        .collect();

    let mut codes = HashSet::new();
    for handle in handles {
        codes.insert(handle.await.unwrap());
    }
    assert_eq!(codes.len(), 20);
    assert!(codes.contains("CC-0001"));
    assert!(codes.contains("CC-0020"));

    let page = repo
        .list_budgets(&GetBudgetsInput {
            project_id: project_id.clone(),
            search_key: "line 1".to_string(),
            page_size: None,
            page_index: 0,
        })
        .await
        .unwrap();
    // "Line 1" and "Line 10" through "Line 19".
    assert_eq!(page.count, 11);
}

#[tokio::test]
async fn test_cost_codes_are_not_reused_after_delete() {
    let repo = LocalRepository::new();
    let project_id = project(&repo).await;
    let owner = UserId::new("owner");

    let first = repo.create_budget(&project_id, "Site setup", 10.0, 1.0, &owner).await.unwrap();
    repo.delete_budget(&first.id).await.unwrap();
    let second = repo.create_budget(&project_id, "Groundworks", 10.0, 1.0, &owner).await.unwrap();
    assert_eq!(second.cost_code, "CC-0002");
}

#[tokio::test]
async fn test_deleting_budget_removes_its_invoices() {
    let repo = LocalRepository::new();
    let project_id = project(&repo).await;
    let owner = UserId::new("owner");
    let budget = repo.create_budget(&project_id, "Formwork", 500.0, 1.0, &owner).await.unwrap();

    let fields = SupplierInvoiceFields {
        invoice_no: "INV-1".to_string(),
        invoice_date: Utc::now(),
        supplier_name: "Timber Ltd".to_string(),
        subtotal: 40.0,
        taxes: 0.0,
        discount: 1.0,
        grand_total: 39.0,
        file_id: None,
        project_id: project_id.clone(),
        budget_id: budget.id.clone(),
        paid: false,
        approved: true,
    };
    repo.create_supplier_invoice(&fields, &[], &owner).await.unwrap();
    assert_eq!(repo.budget_totals(&project_id).await.unwrap().costs_incurred_sum, 40.0);

    repo.delete_budget(&budget.id).await.unwrap();
    let filter = GetSupplierInvoicesInput {
        project_id: project_id.clone(),
        ..Default::default()
    };
    assert!(repo.list_supplier_invoices(&filter).await.unwrap().is_empty());
    assert_eq!(repo.budget_totals(&project_id).await.unwrap().expected_budget_sum, 0.0);
}

#[tokio::test]
async fn test_user_upsert_and_search() {
    let repo = LocalRepository::new();
    repo.upsert_user(&user("ada", Some("ada@site.test"))).await.unwrap();
    repo.upsert_user(&user("bob", Some("bob@other.test"))).await.unwrap();

    // A later sign-in without an email keeps the stored one.
    let updated = repo.upsert_user(&user("ada", None)).await.unwrap();
    assert_eq!(updated.email.as_deref(), Some("ada@site.test"));

    let found = repo.search_users_by_email("SITE.test").await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].id.as_str(), "ada");
    assert!(repo.search_users_by_email("").await.unwrap().is_empty());
}
