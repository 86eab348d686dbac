mod bind;
mod command_id;
mod command_status;
mod deliver_sm;
mod enquire_link;
pub mod esm_class;
mod generic_nack;
mod interface_version;
mod numeric_plan_indicator;
mod query_sm;
mod submit_sm;
mod tlv;
mod type_of_number;
mod unbind;

pub use bind::{BindRequest, BindResponse, BindType};
pub use command_id::CommandId;
pub use command_status::CommandStatus;
pub use deliver_sm::{DeliverSm, DeliverSmResponse};
pub use enquire_link::{EnquireLink, EnquireLinkResponse};
pub use generic_nack::GenericNack;
pub use interface_version::InterfaceVersion;
pub use numeric_plan_indicator::NumericPlanIndicator;
pub use query_sm::{MessageState, QuerySm, QuerySmResponse};
pub use submit_sm::{SubmitSm, SubmitSmResponse};
pub use tlv::{Tlv, tags};
pub use type_of_number::TypeOfNumber;
pub use unbind::{Unbind, UnbindResponse};
