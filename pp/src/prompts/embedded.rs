//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Clarifying-question prompt
pub const BASE_CHAT: &str = include_str!("../../prompts/base-chat.pmt");

/// PRD generation prompt
pub const PRD: &str = include_str!("../../prompts/prd.pmt");

/// User stories generation prompt
pub const USER_STORIES: &str = include_str!("../../prompts/user-stories.pmt");

/// Technical plan generation prompt
pub const TECHNICAL_PLAN: &str = include_str!("../../prompts/technical-plan.pmt");

/// Developer chat prompt
pub const DEVELOPER_CHAT: &str = include_str!("../../prompts/developer-chat.pmt");

/// Ticket summary prompt
pub const TICKET_SUMMARY: &str = include_str!("../../prompts/ticket-summary.pmt");

/// Code-agent brief prompt
pub const CODE_AGENT_BRIEF: &str = include_str!("../../prompts/code-agent-brief.pmt");

/// New-PRD document skeleton
pub const PRD_SKELETON: &str = include_str!("../../templates/prd.md");

/// New-feature document skeleton
pub const FEATURE_SKELETON: &str = include_str!("../../templates/feature.md");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "base-chat" => Some(BASE_CHAT),
        "prd" => Some(PRD),
        "user-stories" => Some(USER_STORIES),
        "technical-plan" => Some(TECHNICAL_PLAN),
        "developer-chat" => Some(DEVELOPER_CHAT),
        "ticket-summary" => Some(TICKET_SUMMARY),
        "code-agent-brief" => Some(CODE_AGENT_BRIEF),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}

/// Get the embedded document skeleton by template file name
pub fn get_skeleton(name: &str) -> Option<&'static str> {
    debug!(%name, "get_skeleton: called");
    match name {
        "prd.md" => Some(PRD_SKELETON),
        "feature.md" => Some(FEATURE_SKELETON),
        _ => None,
    }
}
