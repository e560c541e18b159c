//! Web app menu button
//!
//! Shows the Shabbat Runner game as the chat menu button, either for every
//! chat or for a single user.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use teloxide::prelude::*;
use teloxide::types::{MenuButton, WebAppInfo};
use tracing::{error, info, warn};

use crate::config::MenuButtonConfig;
use crate::services::registry::ManagedService;
use crate::utils::errors::Result;

/// Registry name of the shared [`MenuButtonService`]
pub const MENU_BUTTON_SERVICE: &str = "menu_button";

pub struct MenuButtonService {
    bot: Bot,
    http: reqwest::Client,
    text: String,
    web_app_url: url::Url,
    button_set: AtomicBool,
}

impl MenuButtonService {
    pub fn new(bot: Bot, config: &MenuButtonConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            bot,
            http,
            text: config.text.clone(),
            web_app_url: url::Url::parse(&config.web_app_url)?,
            button_set: AtomicBool::new(false),
        })
    }

    pub fn web_app_button(&self) -> MenuButton {
        MenuButton::WebApp {
            text: self.text.clone(),
            web_app: WebAppInfo {
                url: self.web_app_url.clone(),
            },
        }
    }

    /// Whether a web app button was set successfully at least once
    pub fn is_set(&self) -> bool {
        self.button_set.load(Ordering::Relaxed)
    }

    /// Set the game button for `chat_id`, or as the default for all chats.
    ///
    /// The game URL is checked first; an unreachable URL is only logged.
    pub async fn set_webapp_menu_button(&self, chat_id: Option<i64>) -> bool {
        self.check_web_app_url().await;

        if self.apply(chat_id, self.web_app_button()).await {
            self.button_set.store(true, Ordering::Relaxed);
            true
        } else {
            false
        }
    }

    /// Restore Telegram's default menu button
    pub async fn remove_menu_button(&self, chat_id: Option<i64>) -> bool {
        self.apply(chat_id, MenuButton::Default).await
    }

    async fn apply(&self, chat_id: Option<i64>, button: MenuButton) -> bool {
        let mut request = self.bot.set_chat_menu_button().menu_button(button);
        if let Some(chat_id) = chat_id {
            request = request.chat_id(ChatId(chat_id));
        }

        let target = chat_id
            .map(|id| format!("user {}", id))
            .unwrap_or_else(|| "all users".to_string());

        match request.await {
            Ok(_) => {
                info!(target = %target, "Menu button updated");
                true
            }
            Err(e) => {
                error!(target = %target, error = %e, "Failed to update menu button");
                false
            }
        }
    }

    async fn check_web_app_url(&self) {
        match self.http.get(self.web_app_url.clone()).send().await {
            Ok(response) if response.status().as_u16() >= 300 => {
                warn!(
                    url = %self.web_app_url,
                    status = response.status().as_u16(),
                    "Web app URL does not answer with success"
                );
            }
            Ok(_) => {}
            Err(e) => error!(url = %self.web_app_url, error = %e, "Web app URL check failed"),
        }
    }
}

impl ManagedService for MenuButtonService {}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn config() -> MenuButtonConfig {
        MenuButtonConfig {
            text: "🎮 Shabbat Runner: Kedusha Path".to_string(),
            web_app_url: "https://example.org/game".to_string(),
        }
    }

    #[test]
    fn test_web_app_button() {
        let service = MenuButtonService::new(Bot::new("test_token"), &config()).unwrap();

        assert_matches!(
            service.web_app_button(),
            MenuButton::WebApp { text, web_app } if text == "🎮 Shabbat Runner: Kedusha Path"
                && web_app.url.as_str() == "https://example.org/game"
        );
        assert!(!service.is_set());
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let mut config = config();
        config.web_app_url = "::not a url".to_string();
        assert!(MenuButtonService::new(Bot::new("test_token"), &config).is_err());
    }
}
