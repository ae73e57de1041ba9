use crate::byte_buf::ByteBuf;
use crate::error::CodecResult;

/// A stable, immutable identity: assigned once by the identity service and
/// never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub user_id: i32,
    pub username: String,
}

impl UserProfile {
    pub fn new(user_id: i32, username: impl Into<String>) -> Self {
        Self {
            user_id,
            username: username.into(),
        }
    }

    pub fn encode(&self, buf: &mut ByteBuf) {
        buf.write_i32(self.user_id);
        buf.write_string(&self.username);
    }

    pub fn decode(buf: &mut ByteBuf) -> CodecResult<Self> {
        let user_id = buf.read_i32()?;
        let username = buf.read_string()?;
        Ok(Self { user_id, username })
    }
}

/// A `UserProfile` tagged with whether it occupies a monitor slot in the
/// room. Always encoded as one unit — never as two parallel lists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullUserProfile {
    pub profile: UserProfile,
    pub monitor: bool,
}

impl FullUserProfile {
    pub fn new(profile: UserProfile, monitor: bool) -> Self {
        Self { profile, monitor }
    }

    pub fn encode(&self, buf: &mut ByteBuf) {
        self.profile.encode(buf);
        buf.write_bool(self.monitor);
    }

    pub fn decode(buf: &mut ByteBuf) -> CodecResult<Self> {
        let profile = UserProfile::decode(buf)?;
        let monitor = buf.read_bool()?;
        Ok(Self { profile, monitor })
    }

    /// Combine a players list and a monitors list into the single tagged
    /// sequence the wire format expects: players first, monitors after.
    pub fn from_lists(users: &[UserProfile], monitors: &[UserProfile]) -> Vec<FullUserProfile> {
        users
            .iter()
            .cloned()
            .map(|p| FullUserProfile::new(p, false))
            .chain(monitors.iter().cloned().map(|p| FullUserProfile::new(p, true)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_user_profile_roundtrip() {
        let mut buf = ByteBuf::new();
        let fup = FullUserProfile::new(UserProfile::new(42, "Alice"), true);
        fup.encode(&mut buf);
        assert_eq!(FullUserProfile::decode(&mut buf).unwrap(), fup);
    }

    #[test]
    fn from_lists_orders_players_before_monitors() {
        let users = vec![UserProfile::new(1, "a")];
        let monitors = vec![UserProfile::new(2, "b")];
        let combined = FullUserProfile::from_lists(&users, &monitors);
        assert_eq!(combined.len(), 2);
        assert!(!combined[0].monitor);
        assert!(combined[1].monitor);
    }
}
