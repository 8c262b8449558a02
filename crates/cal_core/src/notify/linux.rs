use crate::error::AppError;
use crate::notify::{launch_show, Notifier, ReminderMessage};
use notify_rust::Notification;

pub struct LinuxNotifier;

impl Notifier for LinuxNotifier {
    fn notify(&self, message: &ReminderMessage) -> Result<(), AppError> {
        self.notify_with_action(message, "")
    }

    fn notify_with_action(&self, message: &ReminderMessage, action: &str) -> Result<(), AppError> {
        let mut notification = Notification::new();
        notification.appname("calcli");
        notification.summary(&message.title);
        notification.body(&message.body);
        if !action.trim().is_empty() {
            notification.action(action, "Open");
        }

        let handle = notification
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;

        if !action.trim().is_empty() {
            let action_key = action.to_string();
            let schedule_id = message.tag.clone();
            std::thread::spawn(move || {
                let _ = handle.wait_for_action(|selected| {
                    if selected == action_key || selected == "default" {
                        let _ = launch_show(&schedule_id);
                    }
                });
            });
        }

        Ok(())
    }
}
