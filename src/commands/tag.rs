//! Tag command - show how an identity's licenses are marked.

use anyhow::{Result, bail};
use clap::Args;

use crate::tenancy::{stamp_note, tag};
use crate::types::ResellerIdentity;

#[derive(Args)]
pub struct TagCmd {
    /// Reseller identity (license key or username)
    pub identity: String,

    /// Also show the stamped form of this note
    #[arg(long)]
    pub note: Option<String>,
}

impl TagCmd {
    pub async fn run(&self) -> Result<()> {
        let Some(identity) = ResellerIdentity::parse(&self.identity) else {
            bail!("'{}' has no alphanumeric characters and cannot own licenses", self.identity);
        };

        println!("{}", tag(&identity));
        if let Some(note) = &self.note {
            println!("{}", stamp_note(note, &identity));
        }
        Ok(())
    }
}
