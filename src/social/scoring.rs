// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Hearth Marketplace

//! Creator tier scoring.
//!
//! Pure functions: given the social-account snapshots currently on disk,
//! derive a quality score per platform and map the aggregate to a
//! commission tier. Recomputation always starts from scratch; there is no
//! incremental state to drift.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::storage::StoredSocialAccount;

/// Commission tier for a creator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum CreatorTier {
    Bronze,
    Silver,
    Gold,
    Platinum,
}

impl CreatorTier {
    /// Commission rate for promotions created at this tier, in basis points.
    pub fn commission_rate_bps(&self) -> u32 {
        match self {
            Self::Bronze => 200,
            Self::Silver => 350,
            Self::Gold => 500,
            Self::Platinum => 800,
        }
    }
}

/// Result of a tier recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct TierAssessment {
    /// Assigned tier
    pub tier: CreatorTier,
    /// Aggregate quality score (0-100)
    pub score: f64,
    /// Commission rate in basis points
    pub commission_rate_bps: u32,
}

/// Follower-count component of the quality score (0-100).
fn follower_points(followers: u64) -> f64 {
    match followers {
        0..=999 => 0.0,
        1_000..=4_999 => 10.0,
        5_000..=24_999 => 25.0,
        25_000..=99_999 => 45.0,
        100_000..=499_999 => 70.0,
        500_000..=999_999 => 90.0,
        _ => 100.0,
    }
}

/// Engagement-rate component of the quality score (0-100).
fn engagement_points(rate: f64) -> f64 {
    if rate >= 0.08 {
        100.0
    } else if rate >= 0.05 {
        80.0
    } else if rate >= 0.03 {
        60.0
    } else if rate >= 0.015 {
        40.0
    } else if rate >= 0.005 {
        20.0
    } else {
        0.0
    }
}

/// Quality score for one platform snapshot (0-100).
///
/// Reach dominates but cannot carry a dead audience: 60% followers,
/// 40% engagement.
pub fn platform_quality_score(account: &StoredSocialAccount) -> f64 {
    0.6 * follower_points(account.followers) + 0.4 * engagement_points(account.engagement_rate)
}

/// Recompute the tier from every verified snapshot.
///
/// The strongest platform sets the baseline; each additional verified
/// platform contributes a tenth of its own score, capped at 100 overall.
/// No verified accounts means no tier and zero commission.
pub fn compute_tier(accounts: &[StoredSocialAccount]) -> Option<TierAssessment> {
    let mut scores: Vec<f64> = accounts
        .iter()
        .filter(|a| a.verified)
        .map(platform_quality_score)
        .collect();

    if scores.is_empty() {
        return None;
    }

    scores.sort_by(|a, b| b.partial_cmp(a).expect("scores are finite"));
    let aggregate: f64 = scores[0] + scores[1..].iter().sum::<f64>() * 0.1;
    let score = aggregate.min(100.0);

    let tier = if score >= 85.0 {
        CreatorTier::Platinum
    } else if score >= 65.0 {
        CreatorTier::Gold
    } else if score >= 40.0 {
        CreatorTier::Silver
    } else if score >= 15.0 {
        CreatorTier::Bronze
    } else {
        return None;
    };

    Some(TierAssessment {
        tier,
        score,
        commission_rate_bps: tier.commission_rate_bps(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::SocialPlatform;
    use chrono::Utc;

    fn snapshot(
        platform: SocialPlatform,
        followers: u64,
        engagement_rate: f64,
        verified: bool,
    ) -> StoredSocialAccount {
        StoredSocialAccount {
            creator_user_id: "creator-1".to_string(),
            platform,
            handle: "@test".to_string(),
            followers,
            engagement_rate,
            verified,
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn no_accounts_means_no_tier() {
        assert_eq!(compute_tier(&[]), None);
    }

    #[test]
    fn unverified_accounts_do_not_count() {
        let accounts = vec![snapshot(SocialPlatform::Instagram, 1_000_000, 0.1, false)];
        assert_eq!(compute_tier(&accounts), None);
    }

    #[test]
    fn tiny_account_earns_no_tier() {
        let accounts = vec![snapshot(SocialPlatform::Instagram, 200, 0.002, true)];
        assert_eq!(compute_tier(&accounts), None);
    }

    #[test]
    fn midsize_engaged_account_reaches_silver() {
        // 25k followers (45 pts) with 3.5% engagement (60 pts):
        // 0.6*45 + 0.4*60 = 51
        let accounts = vec![snapshot(SocialPlatform::Instagram, 25_000, 0.035, true)];
        let assessment = compute_tier(&accounts).unwrap();
        assert_eq!(assessment.tier, CreatorTier::Silver);
        assert_eq!(assessment.commission_rate_bps, 350);
    }

    #[test]
    fn large_engaged_account_reaches_platinum() {
        let accounts = vec![snapshot(SocialPlatform::Youtube, 2_000_000, 0.09, true)];
        let assessment = compute_tier(&accounts).unwrap();
        assert_eq!(assessment.tier, CreatorTier::Platinum);
        assert_eq!(assessment.commission_rate_bps, 800);
    }

    #[test]
    fn extra_platforms_nudge_the_score() {
        let single = vec![snapshot(SocialPlatform::Instagram, 100_000, 0.05, true)];
        let single_score = compute_tier(&single).unwrap().score;

        let multi = vec![
            snapshot(SocialPlatform::Instagram, 100_000, 0.05, true),
            snapshot(SocialPlatform::Tiktok, 25_000, 0.03, true),
        ];
        let multi_score = compute_tier(&multi).unwrap().score;

        assert!(multi_score > single_score);
    }

    #[test]
    fn score_is_capped_at_hundred() {
        let accounts = vec![
            snapshot(SocialPlatform::Instagram, 2_000_000, 0.1, true),
            snapshot(SocialPlatform::Tiktok, 2_000_000, 0.1, true),
            snapshot(SocialPlatform::Youtube, 2_000_000, 0.1, true),
        ];
        let assessment = compute_tier(&accounts).unwrap();
        assert_eq!(assessment.score, 100.0);
        assert_eq!(assessment.tier, CreatorTier::Platinum);
    }
}
