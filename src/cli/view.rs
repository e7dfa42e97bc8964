use crate::domain::ResultSet;
use crate::refresh::SurfaceView;

const MAX_TEXT: usize = 80;

/// Prints a feed surface to the terminal.
pub struct ConsoleView {
    pub limit: usize,
}

impl SurfaceView for ConsoleView {
    fn show_progress(&self) {
        eprintln!("Refreshing...");
    }

    fn hide_progress(&self) {}

    fn refresh_complete(&self) {}

    fn show_items(&self, items: &ResultSet) {
        if items.is_empty() {
            println!("(no items)");
            return;
        }
        for item in items.iter().take(self.limit) {
            let text: String = item.text.chars().take(MAX_TEXT).collect();
            println!("{:>12}  {:<16} {}", item.id, item.display_author(), text);
        }
        if items.len() > self.limit {
            println!("... {} more", items.len() - self.limit);
        }
    }

    fn show_error(&self, message: &str) {
        eprintln!("Error: {}", message);
    }

    fn reauthenticate(&self) {
        eprintln!("Set a fresh access_token in the config file and try again.");
    }
}
