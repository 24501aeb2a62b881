use thiserror::Error;

/// Referential failures reported by chain and skeleton operations.
///
/// Every operation that returns one of these leaves the solver untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IkError {
    #[error("Unknown chain: {0}")]
    UnknownChain(String),

    #[error("Chain already exists: {0}")]
    DuplicateChain(String),

    #[error("Chain must contain at least one bone")]
    EmptyChain,

    #[error("Bone {bone} out of range (skeleton has {bone_count} bones)")]
    BoneOutOfRange { bone: usize, bone_count: usize },

    #[error("Bone {expected_parent} is not the parent of bone {child}")]
    NotParent { child: usize, expected_parent: usize },

    #[error("Constraint index {index} out of range [1, {len})")]
    ConstraintIndexOutOfRange { index: usize, len: usize },

    #[error("Bone {bone} has parent {parent}, which does not precede it")]
    InvalidParent { bone: usize, parent: usize },
}

pub type IkResult<T> = Result<T, IkError>;
