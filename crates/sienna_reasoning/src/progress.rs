//! XP, levels, daily rewards and the leaderboard.

use chrono::{Duration, NaiveDateTime};
use rand::Rng;
use serde::Serialize;
use sienna_core::{Profile, Progress, UserRecord};
use std::ops::RangeInclusive;

pub const LEADERBOARD_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyReward {
    pub base_xp: u32,
    pub streak_bonus: u32,
    /// Streak after this claim.
    pub streak: u32,
    /// New level if the reward crossed the threshold.
    pub level_up: Option<u32>,
}

impl DailyReward {
    pub fn total(&self) -> u32 {
        self.base_xp + self.streak_bonus
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DailyClaim {
    Granted(DailyReward),
    /// Already claimed on this calendar day; `remaining` is the time left
    /// until local midnight.
    AlreadyClaimed { remaining: Duration },
}

#[derive(Debug, Clone)]
pub struct ProgressEngine {
    pub chat_xp: RangeInclusive<u32>,
    pub daily_xp: RangeInclusive<u32>,
}

impl Default for ProgressEngine {
    fn default() -> Self {
        Self {
            chat_xp: 2..=8,
            daily_xp: 50..=150,
        }
    }
}

impl ProgressEngine {
    /// XP needed to leave `level`.
    pub fn threshold(level: u32) -> u32 {
        level.saturating_mul(100)
    }

    /// Add XP and apply at most one level-up. Crossing the threshold resets
    /// XP to zero; any surplus is discarded. Returns the new level.
    pub fn award_xp(&self, progress: &mut Progress, amount: u32) -> Option<u32> {
        progress.xp = progress.xp.saturating_add(amount);
        if progress.xp >= Self::threshold(progress.level) {
            progress.level += 1;
            progress.xp = 0;
            Some(progress.level)
        } else {
            None
        }
    }

    /// Accrual for one completed model-backed chat turn.
    pub fn on_chat_turn<R: Rng + ?Sized>(&self, progress: &mut Progress, rng: &mut R) -> Option<u32> {
        progress.messages = progress.messages.saturating_add(1);
        let gain = rng.gen_range(self.chat_xp.clone());
        self.award_xp(progress, gain)
    }

    /// Once per calendar day of `now`. A claim on the day after the previous
    /// one extends the streak; any longer gap starts a new streak.
    pub fn claim_daily<R: Rng + ?Sized>(
        &self,
        profile: &mut Profile,
        progress: &mut Progress,
        now: NaiveDateTime,
        rng: &mut R,
    ) -> DailyClaim {
        let today = now.date();
        if profile.last_daily_claim == Some(today) {
            let remaining = today
                .succ_opt()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|midnight| midnight - now)
                .unwrap_or_else(Duration::zero);
            return DailyClaim::AlreadyClaimed { remaining };
        }

        let continues = profile
            .last_daily_claim
            .and_then(|last| last.succ_opt())
            .is_some_and(|next| next == today);
        profile.daily_streak = if continues {
            profile.daily_streak.saturating_add(1)
        } else {
            1
        };
        profile.last_daily_claim = Some(today);

        let base_xp = rng.gen_range(self.daily_xp.clone());
        let streak_bonus = streak_bonus(profile.daily_streak);
        let level_up = self.award_xp(progress, base_xp + streak_bonus);
        DailyClaim::Granted(DailyReward {
            base_xp,
            streak_bonus,
            streak: profile.daily_streak,
            level_up,
        })
    }
}

pub fn streak_bonus(streak: u32) -> u32 {
    match streak {
        s if s >= 7 => 100,
        s if s >= 3 => 50,
        _ => 0,
    }
}

// ============================================================================
// Leaderboard
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub user_id: String,
    pub display_name: String,
    pub level: u32,
    pub xp: u32,
    pub messages: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardPage {
    pub page: usize,
    pub total_pages: usize,
    pub entries: Vec<LeaderboardEntry>,
}

/// Activated users ordered by `(level, xp)` descending. `records` must be
/// sorted by user id; equal scores keep that order.
pub fn ranking(records: &[(String, UserRecord)]) -> Vec<LeaderboardEntry> {
    let mut active: Vec<&(String, UserRecord)> =
        records.iter().filter(|(_, r)| r.profile.activated).collect();
    active.sort_by(|(_, a), (_, b)| {
        (b.progress.level, b.progress.xp).cmp(&(a.progress.level, a.progress.xp))
    });
    active
        .into_iter()
        .enumerate()
        .map(|(i, (user_id, record))| LeaderboardEntry {
            rank: i + 1,
            user_id: user_id.clone(),
            display_name: record.display_name_or(user_id),
            level: record.progress.level,
            xp: record.progress.xp,
            messages: record.progress.messages,
        })
        .collect()
}

/// One 1-based page. Pages past the end (and page 0) are empty.
pub fn leaderboard_page(records: &[(String, UserRecord)], page: usize) -> LeaderboardPage {
    let all = ranking(records);
    let total_pages = all.len().div_ceil(LEADERBOARD_PAGE_SIZE);
    let entries = if page == 0 {
        Vec::new()
    } else {
        all.into_iter()
            .skip((page - 1) * LEADERBOARD_PAGE_SIZE)
            .take(LEADERBOARD_PAGE_SIZE)
            .collect()
    };
    LeaderboardPage {
        page,
        total_pages,
        entries,
    }
}

pub fn rank_of(records: &[(String, UserRecord)], user_id: &str) -> Option<LeaderboardEntry> {
    ranking(records).into_iter().find(|e| e.user_id == user_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_level_up_discards_surplus() {
        let engine = ProgressEngine::default();
        let mut p = Progress { level: 1, xp: 95, messages: 0 };
        assert_eq!(engine.award_xp(&mut p, 10), Some(2));
        assert_eq!((p.level, p.xp), (2, 0));
    }

    #[test]
    fn test_no_cascade_on_huge_gain() {
        let engine = ProgressEngine::default();
        let mut p = Progress::default();
        assert_eq!(engine.award_xp(&mut p, 10_000), Some(2));
        assert_eq!((p.level, p.xp), (2, 0));
    }

    #[test]
    fn test_chat_turn_counts_message_and_gains_in_range() {
        let engine = ProgressEngine::default();
        let mut rng = StdRng::seed_from_u64(11);
        let mut p = Progress::default();
        for _ in 0..10 {
            let before = p.xp;
            engine.on_chat_turn(&mut p, &mut rng);
            assert!((2..=8).contains(&(p.xp - before)));
        }
        assert_eq!(p.messages, 10);
    }

    #[test]
    fn test_daily_once_per_calendar_day() {
        let engine = ProgressEngine::default();
        let mut rng = StdRng::seed_from_u64(5);
        let mut profile = Profile::default();
        let mut p = Progress { level: 10, xp: 0, messages: 0 };

        let first = engine.claim_daily(&mut profile, &mut p, at(2026, 3, 1, 23, 0), &mut rng);
        let DailyClaim::Granted(reward) = first else {
            panic!("first claim rejected");
        };
        assert!((50..=150).contains(&reward.base_xp));
        assert_eq!(p.xp, reward.total());

        let xp_after = p.xp;
        let second = engine.claim_daily(&mut profile, &mut p, at(2026, 3, 1, 23, 30), &mut rng);
        assert_eq!(second, DailyClaim::AlreadyClaimed { remaining: Duration::minutes(30) });
        assert_eq!(p.xp, xp_after);

        // Keyed by date: just after midnight is a new day.
        let third = engine.claim_daily(&mut profile, &mut p, at(2026, 3, 2, 0, 5), &mut rng);
        assert!(matches!(third, DailyClaim::Granted(DailyReward { streak: 2, .. })));
    }

    #[test]
    fn test_streak_bonus_and_gap_reset() {
        let engine = ProgressEngine::default();
        let mut rng = StdRng::seed_from_u64(9);
        let mut profile = Profile::default();
        let mut p = Progress { level: 100, xp: 0, messages: 0 };

        let mut last = None;
        for day in 1..=7 {
            if let DailyClaim::Granted(r) = engine.claim_daily(&mut profile, &mut p, at(2026, 5, day, 9, 0), &mut rng) {
                last = Some(r);
            }
        }
        let r = last.unwrap();
        assert_eq!(r.streak, 7);
        assert_eq!(r.streak_bonus, 100);

        let DailyClaim::Granted(r) = engine.claim_daily(&mut profile, &mut p, at(2026, 5, 10, 9, 0), &mut rng) else {
            panic!("claim after gap rejected");
        };
        assert_eq!(r.streak, 1);
        assert_eq!(r.streak_bonus, 0);
    }

    fn rec(activated: bool, level: u32, xp: u32, name: Option<&str>) -> UserRecord {
        let mut r = UserRecord::fresh("Sienna");
        r.profile.activated = activated;
        r.profile.display_name = name.map(str::to_string);
        r.progress = Progress { level, xp, messages: 3 };
        r
    }

    #[test]
    fn test_ranking_order_and_ties() {
        let records = vec![
            ("100".to_string(), rec(true, 2, 10, Some("A"))),
            ("200".to_string(), rec(true, 3, 0, Some("B"))),
            ("300".to_string(), rec(false, 9, 0, Some("Hidden"))),
            ("400".to_string(), rec(true, 2, 10, None)),
            ("500".to_string(), rec(true, 2, 50, Some("C"))),
        ];
        let board = ranking(&records);
        let ids: Vec<&str> = board.iter().map(|e| e.user_id.as_str()).collect();
        assert_eq!(ids, vec!["200", "500", "100", "400"]);
        assert_eq!(board[3].display_name, "User400");
        assert_eq!(board[3].rank, 4);
    }

    #[test]
    fn test_pages() {
        let records: Vec<(String, UserRecord)> = (0..23)
            .map(|i| (format!("{i:03}"), rec(true, 1, i, None)))
            .collect();
        let p1 = leaderboard_page(&records, 1);
        assert_eq!(p1.total_pages, 3);
        assert_eq!(p1.entries.len(), 10);
        assert_eq!(p1.entries[0].xp, 22);
        assert_eq!(leaderboard_page(&records, 3).entries.len(), 3);
        assert!(leaderboard_page(&records, 4).entries.is_empty());
        assert!(leaderboard_page(&records, 0).entries.is_empty());

        let me = rank_of(&records, "000").unwrap();
        assert_eq!(me.rank, 23);
        assert!(rank_of(&records, "999").is_none());
    }
}
