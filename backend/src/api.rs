//! Public API surface of the backend.
//!
//! Identifier newtypes live here together with re-exports of the records and
//! wire types that cross the RPC boundary, so clients can depend on a single
//! module.

pub use crate::models::{
    Budget, BudgetLabel, BudgetPage, BudgetRow, BudgetTotals, CreatedProject, Laborer, Material,
    MaterialUnit, Membership, Plant, ProfessionalRole, Project, ProjectListItem, ProjectMember,
    SiteDiary, SiteDiaryDetail, SiteDiaryListItem, SiteProblem, SupplierInvoice,
    SupplierInvoiceDetail, SupplierInvoiceExport, SupplierInvoiceItem, SupplierInvoiceWithBudget,
    Task, TaskListItem, TaskPage, TaskPerson, TaskSearchCategory, TaskStatus, User, UserSummary,
    Weather, WeatherCondition, WorkProgress,
};
pub use crate::routes::extraction::{ExtractedInvoice, ExtractedInvoiceItem};
pub use crate::routes::storage::{CreatedFolder, FileEntry, PresignedDownload, PresignedUpload};
pub use crate::routes::supplier_invoice::{CsvExport, SavedSupplierInvoice};

crate::define_id_type!(UserId);
crate::define_id_type!(ProjectId);
crate::define_id_type!(SiteDiaryId);
crate::define_id_type!(PlantId);
crate::define_id_type!(LaborerId);
crate::define_id_type!(MaterialId);
crate::define_id_type!(SiteProblemId);
crate::define_id_type!(WorkProgressId);
crate::define_id_type!(WeatherId);
crate::define_id_type!(TaskId);
crate::define_id_type!(BudgetId);
crate::define_id_type!(SupplierInvoiceId);
crate::define_id_type!(SupplierInvoiceItemId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_serialize_as_plain_strings() {
        let id = ProjectId::new("3f2a");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"3f2a\"");
        let back: ProjectId = serde_json::from_str("\"3f2a\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let a = TaskId::generate();
        let b = TaskId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().len(), 36);
    }

    #[test]
    fn test_blank_id_is_empty() {
        assert!(BudgetId::new("  ").is_empty());
        assert!(!BudgetId::new("b1").is_empty());
    }
}
