//! Inline button payloads.
//!
//! Every button the bot sends carries one of these as callback data.
//! Parsing is a plain lookup; anything unrecognised gets the "unknown
//! action" alert.

use crate::catalog::PagedSection;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CallbackAction {
    Verify,
    ShowChannels,
    MainMenu,
    Withdraw,
    AllBots,
    Premium,
    Mining,
    Profile,
    Referral,
    About,
    NeedRefs,
    MiningLocked,
    /// A gated special listing, by index.
    Locked(usize),
    SetUsername,
    AdminSendSpecific,
    AdminSendAll,
    AdminCancel,
    Page { section: PagedSection, page: usize },
    /// Admin user listing, zero-based page.
    UsersPage(i64),
}

impl CallbackAction {
    pub fn parse(data: &str) -> Option<Self> {
        let action = match data {
            "verify" => Self::Verify,
            "show_channels" => Self::ShowChannels,
            "main_menu" => Self::MainMenu,
            "withdraw" => Self::Withdraw,
            "all_bots" => Self::AllBots,
            "premium" => Self::Premium,
            "mining" => Self::Mining,
            "profile" => Self::Profile,
            "referral" => Self::Referral,
            "about" => Self::About,
            "need_refs" => Self::NeedRefs,
            "mining_locked" => Self::MiningLocked,
            // Older keyboards still carry this one.
            "click_bee_locked" => Self::Locked(0),
            "set_username" => Self::SetUsername,
            "admin_send_specific" => Self::AdminSendSpecific,
            "admin_send_all" => Self::AdminSendAll,
            "admin_cancel" => Self::AdminCancel,
            other => return Self::parse_indexed(other),
        };
        Some(action)
    }

    fn parse_indexed(data: &str) -> Option<Self> {
        if let Some(index) = data.strip_prefix("locked:") {
            return index.parse().ok().map(Self::Locked);
        }

        let (key, page) = data.rsplit_once("_page_")?;
        if key == "users" {
            return page.parse().ok().filter(|p| *p >= 0).map(Self::UsersPage);
        }
        let section = PagedSection::from_key(key)?;
        let page = page.parse().ok()?;
        Some(Self::Page { section, page })
    }

    /// Callback data for this action.
    pub fn data(self) -> String {
        match self {
            Self::Verify => "verify".into(),
            Self::ShowChannels => "show_channels".into(),
            Self::MainMenu => "main_menu".into(),
            Self::Withdraw => "withdraw".into(),
            Self::AllBots => "all_bots".into(),
            Self::Premium => "premium".into(),
            Self::Mining => "mining".into(),
            Self::Profile => "profile".into(),
            Self::Referral => "referral".into(),
            Self::About => "about".into(),
            Self::NeedRefs => "need_refs".into(),
            Self::MiningLocked => "mining_locked".into(),
            Self::Locked(index) => format!("locked:{index}"),
            Self::SetUsername => "set_username".into(),
            Self::AdminSendSpecific => "admin_send_specific".into(),
            Self::AdminSendAll => "admin_send_all".into(),
            Self::AdminCancel => "admin_cancel".into(),
            Self::Page { section, page } => format!("{}_page_{}", section.key(), page),
            Self::UsersPage(page) => format!("users_page_{page}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_fixed_tokens() {
        assert_eq!(CallbackAction::parse("verify"), Some(CallbackAction::Verify));
        assert_eq!(CallbackAction::parse("main_menu"), Some(CallbackAction::MainMenu));
        assert_eq!(CallbackAction::parse("admin_cancel"), Some(CallbackAction::AdminCancel));
        assert_eq!(CallbackAction::parse("click_bee_locked"), Some(CallbackAction::Locked(0)));
    }

    #[test]
    fn parses_indexed_tokens() {
        assert_eq!(CallbackAction::parse("locked:2"), Some(CallbackAction::Locked(2)));
        assert_eq!(
            CallbackAction::parse("mining_bots_page_3"),
            Some(CallbackAction::Page {
                section: PagedSection::Mining,
                page: 3
            })
        );
        assert_eq!(CallbackAction::parse("users_page_1"), Some(CallbackAction::UsersPage(1)));
    }

    #[test]
    fn rejects_garbage() {
        for data in ["", "VERIFY", "locked:x", "premium_bots_page_1", "all_bots_page_-1", "users_page_-2", "warn_remove:1"] {
            assert_eq!(CallbackAction::parse(data), None, "{data}");
        }
    }

    #[test]
    fn data_parses_back() {
        let actions = [
            CallbackAction::Verify,
            CallbackAction::Locked(4),
            CallbackAction::Page {
                section: PagedSection::AllBots,
                page: 7,
            },
            CallbackAction::UsersPage(2),
        ];
        for action in actions {
            assert_eq!(CallbackAction::parse(&action.data()), Some(action));
        }
    }
}
