//! Build script for vault-revealer
//!
//! - Windows: Embeds the application manifest for long path support (>260 chars)
//!
//! # Windows Long Path Support
//!
//! Encrypted vault paths are long: a Cryptomator file sits under
//! `d/XX/YYYY.../` with a base64url name that is often over 200 characters
//! on its own. By default Windows limits paths to 260 characters (MAX_PATH).
//!
//! The manifest (`vault-revealer.manifest`) declares `longPathAware`, which,
//! combined with the Windows 10 v1607+ registry setting, allows paths up to
//! 32,767 characters. On other platforms this script does nothing.

fn main() {
    #[cfg(windows)]
    {
        embed_resource::compile("vault-revealer.rc", embed_resource::NONE);

        println!("cargo:rerun-if-changed=vault-revealer.rc");
        println!("cargo:rerun-if-changed=vault-revealer.manifest");
    }
}
