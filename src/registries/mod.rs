//! Capability registries: single-writer stores of provider registrations
//! (commands, hover providers, query transformers, ...) queried by the rest
//! of the system.
//!
//! Each registry is owned by exactly one writer (the capability proxy that
//! populates it); every other component reads through the registry's public
//! methods only.

pub mod command;
pub mod contribution;
pub mod decoration;
pub mod provider;
pub mod query_transformer;
pub mod view;

pub use command::{CommandError, CommandRegistry, ExecuteCommandParams};
pub use contribution::ContributionRegistry;
pub use decoration::DecorationRegistry;
pub use provider::{HoverProvider, LocationProvider, ProviderRegistry};
pub use query_transformer::QueryTransformerRegistry;
pub use view::{PanelView, ViewRegistry};

use crate::registries::provider::{HoverProviderRegistry, LocationProviderRegistry};

/// Container for all provider registries the client exposes.
#[derive(Default)]
pub struct Registries {
    pub commands: CommandRegistry,
    pub contribution: ContributionRegistry,
    pub text_document_hover: HoverProviderRegistry,
    pub text_document_definition: LocationProviderRegistry,
    pub text_document_type_definition: LocationProviderRegistry,
    pub text_document_implementation: LocationProviderRegistry,
    pub text_document_references: LocationProviderRegistry,
    pub text_document_decoration: DecorationRegistry,
    pub query_transformer: QueryTransformerRegistry,
    pub views: ViewRegistry,
}
