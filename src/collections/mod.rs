//! Node collections and change notification.
//!
//! A [`NodeCollection`] tracks which `(node, item)` pairs are present, with
//! a count per pair, and notifies subscribers when a pair appears or
//! disappears. [`ModifierNodeCollection`] pairs two such collections over
//! the modifiers of one stat node: observers of the suspendable view see
//! bulk changes, made while the [`EventBuffer`] is suspended, as a single
//! [`CollectionChange::Refresh`].

mod events;
mod modifier_collection;
mod node_collection;

pub use events::{CollectionChange, CollectionId, EventBuffer, Subscribers, SubscriptionId};
pub use modifier_collection::{CollectionView, ModifierNodeCollection};
pub use node_collection::{CalculationNode, NodeChange, NodeCollection};
