pub mod affinity;
pub mod controller;
pub mod pagination;
pub mod providers;
pub mod result_set;
pub mod session;

pub use affinity::AffinityState;
pub use controller::{
    FeedbackController, FeedbackOutcome, Notice, NoticeLevel, Phase, QueryOutcome, ReactOutcome,
    SessionSettings,
};
pub use pagination::{Pager, PagingPolicy};
pub use providers::{HttpRecommender, Recommender};
pub use result_set::{ExclusionPolicy, ResultSet};
pub use session::{spawn_sweeper, Session, SessionStore, SweeperHandle};
