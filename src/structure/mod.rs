// src/structure/mod.rs

//! Composite structures: Stage → Segment → MaterialSuite
//!
//! A [`Stage`] owns its [`Segment`]s, a segment owns its
//! [`MaterialSuite`]s, and a suite owns its items together with its chain of
//! presform derivatives. Element types are fixed by the Rust types, so the
//! only runtime checks left for [`Structure::validate`] are the required
//! parts and the per-structure rules (segment naming, presform extensions,
//! duplicate segment identifiers).
//!
//! Each list is exposed through the same five operations: `X()` for the
//! slice, `set_X` (clear, then add each element in order), `add_X`,
//! `get_X(i)` and `pop_X(i)`.

mod segment;
mod stage;
mod suite;

pub use segment::Segment;
pub use stage::Stage;
pub use suite::{MAX_PRESFORM_DEPTH, MaterialSuite, Presform, SuiteNode, SuiteNodeId};

/// Common validation surface
pub trait Structure {
    /// Names of the parts that must be present
    fn required_parts(&self) -> &'static [&'static str];

    /// Required parts that are absent
    fn missing_parts(&self) -> Vec<String>;

    /// Every reason this structure is invalid, children included
    ///
    /// Empty when the structure is valid. Never mutates.
    fn problems(&self) -> Vec<String>;

    /// Whether the structure, and everything it contains, is valid
    fn validate(&self) -> bool {
        self.problems().is_empty()
    }
}

/// Generates the uniform accessor set for a list field
macro_rules! list_accessors {
    ($field:ident: $ty:ty, $set:ident, $add:ident, $get:ident, $get_mut:ident, $pop:ident) => {
        pub fn $field(&self) -> &[$ty] {
            &self.$field
        }

        /// Clear the list, then add each element in order
        pub fn $set(&mut self, values: impl IntoIterator<Item = $ty>) {
            while self.$pop(0).is_some() {}
            for value in values {
                self.$add(value);
            }
        }

        pub fn $add(&mut self, value: $ty) {
            self.$field.push(value);
        }

        pub fn $get(&self, index: usize) -> Option<&$ty> {
            self.$field.get(index)
        }

        pub fn $get_mut(&mut self, index: usize) -> Option<&mut $ty> {
            self.$field.get_mut(index)
        }

        pub fn $pop(&mut self, index: usize) -> Option<$ty> {
            (index < self.$field.len()).then(|| self.$field.remove(index))
        }
    };
}

pub(crate) use list_accessors;
