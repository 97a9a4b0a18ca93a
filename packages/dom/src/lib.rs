//! # odfkit DOM
//!
//! The document tree the editing engine walks and mutates: an arena of
//! namespace-qualified elements and text nodes with DOM-style operations
//! (insert, split, merge, normalize) and boundary-point comparison.
//!
//! ```rust,ignore
//! use odfkit_dom::{ns, xml, DomPoint};
//!
//! let tree = xml::parse(source)?;
//! let paragraph = tree.find_element(tree.root(), ns::TEXT, "p").unwrap();
//! println!("{}", tree.text_content(paragraph));
//! ```

mod error;
mod name;
mod range;
mod tree;
pub mod xml;

pub use error::{DomError, DomResult};
pub use name::{ns, QName};
pub use range::{DomPoint, DomRange};
pub use tree::{Ancestors, Attribute, Descendants, Element, NodeData, NodeId, NodeRemap, Tree};
