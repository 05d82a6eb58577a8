//! Procedure inputs and outputs grouped by router.
//!
//! Each module holds the wire types of one router plus the procedure path
//! constants (`router.procedure`) used by the dispatcher and the client.

pub mod budget;
pub mod extraction;
pub mod me;
pub mod project;
pub mod site_diary;
pub mod site_diary_entry;
pub mod storage;
pub mod supplier_invoice;
pub mod task;
pub mod validation;

pub use validation::{InputError, InputResult, Validate};

/// Router name of a procedure path, e.g. `budget` for `budget.getBudgets`.
pub fn router_of(path: &str) -> &str {
    path.split_once('.').map(|(router, _)| router).unwrap_or(path)
}

#[cfg(test)]
mod tests {
    #[test]
    fn test_module_structure() {
        assert_eq!(super::project::GET_PROJECTS, "project.getProjects");
        assert_eq!(super::me::GET_USERS, "user.getUsers");
        assert_eq!(
            super::site_diary::UPDATE_SITE_DIARY_WEATHER,
            "weather.updateSiteDiaryWeather"
        );
        assert_eq!(
            super::site_diary_entry::DELETE_WORK_PROGRESS,
            "workProgress.deleteWorkProgress"
        );
        assert_eq!(super::task::GET_TASKS, "task.getTasks");
        assert_eq!(super::budget::GET_BUDGETS, "budget.getBudgets");
        assert_eq!(
            super::supplier_invoice::GET_SUPPLIER_INVOICES_FOR_CSV_DOWNLOAD,
            "supplierInvoice.getSupplierInvoicesForCSVDownload"
        );
        assert_eq!(
            super::storage::GET_PRE_SIGNED_URL_FOR_UPLOAD,
            "s3.getPreSignedURLForUpload"
        );
        assert_eq!(super::extraction::EXTRACT_INVOICE_INFO, "gpt.extractInvoiceInfo");
    }

    #[test]
    fn test_router_of() {
        assert_eq!(super::router_of("budget.getBudgets"), "budget");
        assert_eq!(super::router_of("health"), "health");
    }
}
