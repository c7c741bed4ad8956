mod metadata;

pub use metadata::{sort_newest_first, version_sort_key, MavenMetadata};

/// Well-known Maven repositories used by the Minecraft loader ecosystem.
pub const FORGE_MAVEN: &str = "https://maven.minecraftforge.net";
pub const NEOFORGE_MAVEN: &str = "https://maven.neoforged.net/releases";
pub const CLEANROOM_MAVEN: &str = "https://repo.cleanroommc.com/releases";
