use crate::error::AppError;
use crate::notify::{launch_show, parse_activation_argument, Notifier, ReminderMessage};
use tauri_winrt_notification::Toast;

pub struct WindowsNotifier;

impl Notifier for WindowsNotifier {
    fn notify(&self, message: &ReminderMessage) -> Result<(), AppError> {
        self.notify_with_action(message, "")
    }

    fn notify_with_action(&self, message: &ReminderMessage, action: &str) -> Result<(), AppError> {
        let schedule_id = message.tag.clone();
        let action_value = action.to_string();
        let mut toast = Toast::new(Toast::POWERSHELL_APP_ID)
            .title(&message.title)
            .text1(&message.body)
            .text2(&message.tag);

        if !action_value.trim().is_empty() {
            toast = toast.add_button("Open", &action_value);
        }

        let action_match = action_value.clone();
        toast
            .on_activated(move |args| {
                match args {
                    Some(args) => {
                        if !action_match.is_empty() && args == action_match {
                            let _ = launch_show(&schedule_id);
                        } else if let Some(id) = parse_activation_argument(&args) {
                            let _ = launch_show(&id);
                        } else if args.trim().is_empty() {
                            let _ = launch_show(&schedule_id);
                        }
                    }
                    None => {
                        let _ = launch_show(&schedule_id);
                    }
                }
                Ok(())
            })
            .show()
            .map_err(|err| AppError::io(err.to_string()))?;
        Ok(())
    }
}
