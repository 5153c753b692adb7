use clap::Args;

use lofersil::csrf::generate_signing_key;

#[derive(Args)]
pub struct KeygenCommand {
    /// Print as an environment variable assignment
    #[arg(long)]
    pub env: bool,
}

impl KeygenCommand {
    pub fn run(&self) -> Result<(), Box<dyn std::error::Error>> {
        let key = generate_signing_key()?;
        if self.env {
            println!("LOFERSIL_CSRF_SECRET={}", key);
        } else {
            println!("{}", key);
        }
        Ok(())
    }
}
