use crate::crypto::{AgreementPublicKey, ContentHash, PublicKey};

const USERS: &str = "users";

/// Where everything belonging to one identity lives in the store
///
/// ```text
/// users/{pubkey}/profile           signed profile record
/// users/{pubkey}/index.json        signed post index
/// users/{pubkey}/posts/{postId}    post ciphertext
/// users/{pubkey}/keys/{loc}        wrapped post keys
/// users/{pubkey}/reqs/{ephemeral}  subscription requests
/// users/{pubkey}/inbox/{msgId}     inbox envelopes
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
    root: String,
}

impl Layout {
    pub fn new(owner: &PublicKey) -> Self {
        Self {
            root: format!("{}/{}", USERS, owner.to_hex()),
        }
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn profile(&self) -> String {
        format!("{}/profile", self.root)
    }

    pub fn index(&self) -> String {
        format!("{}/index.json", self.root)
    }

    pub fn posts(&self) -> String {
        format!("{}/posts", self.root)
    }

    pub fn post(&self, post_id: &ContentHash) -> String {
        format!("{}/posts/{}", self.root, post_id)
    }

    pub fn key(&self, location: &ContentHash) -> String {
        format!("{}/keys/{}", self.root, location)
    }

    pub fn requests(&self) -> String {
        format!("{}/reqs", self.root)
    }

    pub fn request(&self, ephemeral: &AgreementPublicKey) -> String {
        format!("{}/reqs/{}", self.root, ephemeral.to_hex())
    }

    pub fn inbox(&self) -> String {
        format!("{}/inbox", self.root)
    }

    pub fn message(&self, message_id: &ContentHash) -> String {
        format!("{}/inbox/{}", self.root, message_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::crypto::SecretKey;

    #[test]
    fn test_paths_are_scoped_to_owner() {
        let owner = SecretKey::generate().public();
        let layout = Layout::new(&owner);
        let id = ContentHash::of(b"post");

        let root = format!("users/{}", owner.to_hex());
        assert_eq!(layout.root(), root);
        assert_eq!(layout.index(), format!("{}/index.json", root));
        assert_eq!(layout.post(&id), format!("{}/posts/{}", root, id.to_hex()));
        assert_eq!(layout.key(&id), format!("{}/keys/{}", root, id.to_hex()));
        assert!(layout.requests().ends_with("/reqs"));
        assert!(layout.message(&id).starts_with(&layout.inbox()));
    }
}
