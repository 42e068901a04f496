//! # Domain Model
//!
//! Two families of types live here:
//!
//! - [`resume`]: the editable [`ResumeDocument`] and its section bookkeeping.
//!   The one invariant every constructor and deserializer maintains is that
//!   `section_order` is a permutation of [`SectionId::ALL`].
//! - [`job`]: [`JobRecord`]s as cached from the server, partial updates
//!   ([`JobPatch`]), the optimistic overlay entry ([`PendingUpdate`]) and
//!   cache bookkeeping ([`CacheMeta`]).
//!
//! Records coming from the server are mapped to these explicit structs at the
//! boundary; unknown JSON properties are ignored rather than carried along.

pub mod job;
pub mod resume;

pub use job::{status_matches, CacheMeta, JobPatch, JobRecord, PendingUpdate};
pub use resume::{
    normalize_section_order, Education, Experience, PersonalInfo, Project, Publication,
    ResumeDocument, SectionId, SectionVisibility, SkillGroup,
};
