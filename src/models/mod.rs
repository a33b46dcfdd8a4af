// Entity records for the intake workflow.
//
// Plain serde structs with uuid/chrono fields. Every record carries a
// `version` used for optimistic check-and-set writes in the store; managers
// never mutate a record without supplying the version they read.

pub mod approval;
pub mod case;
pub mod involvement;
pub mod responses;
pub mod table_match;
pub mod variable;

pub use approval::Approval;
pub use case::Case;
pub use involvement::Involvement;
pub use responses::{
    OwnerResponse, RejectionRouting, RequesterResponse, ResponsePayload, ResponseRecord,
};
pub use table_match::TableMatch;
pub use variable::{Priority, Variable};
