//! Runs gallery client subcommands and prints the resulting gallery.

use super::{Gallery, GalleryClient};
use crate::config::Command;
use anyhow::Result;

pub async fn run(command: Command) -> Result<()> {
    let result = match command {
        Command::List { server } => {
            let mut gallery = Gallery::new(GalleryClient::new(server));
            let result = gallery.refresh().await;
            print!("{}", gallery.render());
            result
        }
        Command::Upload { file, server } => {
            let mut gallery = Gallery::new(GalleryClient::new(server));
            let result = match gallery.select_file(file) {
                Ok(()) => gallery.upload_selected().await.map(|record| {
                    println!("uploaded {} as {}", record.display_name, record.id);
                }),
                Err(err) => Err(err),
            };
            print!("{}", gallery.render());
            result
        }
        Command::Delete { id, server } => {
            let mut gallery = Gallery::new(GalleryClient::new(server));
            let result = gallery.delete(&id).await;
            if result.is_ok() {
                println!("deleted {}", id);
            }
            print!("{}", gallery.render());
            result
        }
    };

    Ok(result?)
}
