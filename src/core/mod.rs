pub mod match_result;
pub mod message;
pub mod profile;
pub mod skill;
pub mod swap;

pub use match_result::{MatchResult, MatchedSkill, RankedMatch};
pub use message::{AdminMessage, NewAdminMessage};
pub use profile::{ProfileRecord, ProfileSnapshot, PublicProfile};
pub use skill::{
    ClaimKind, ProficiencyLevel, SkillClaim, SkillRef, AVAILABILITY_OPTIONS, SKILL_CATEGORIES,
};
pub use swap::{
    NewRating, NewSwapRequest, Rating, RequestDirection, SwapDecision, SwapRequest,
    SwapRequestStatus,
};
