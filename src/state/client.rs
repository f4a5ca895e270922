//! Participants and the ordered collection a room keeps them in.

/// A participant in a room.
///
/// Clients carry no reference back to their room. The room owns them and
/// enforces the rules that depend on room state, such as the vote freeze
/// while results are revealed.
#[derive(Debug, Clone, PartialEq)]
pub struct Client {
    id: String,
    pub name: String,
    pub current_vote: Option<String>,
    pub has_voted: bool,
    pub is_spectator: bool,
    pub is_owner: bool,
}

impl Client {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            current_vote: None,
            has_voted: false,
            is_spectator: false,
            is_owner: false,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Record a vote. An empty or absent vote withdraws the current one.
    pub(crate) fn set_vote(&mut self, vote: Option<String>) {
        match vote.filter(|v| !v.is_empty()) {
            Some(v) => {
                self.current_vote = Some(v);
                self.has_voted = true;
            }
            None => self.clear_vote(),
        }
    }

    pub(crate) fn clear_vote(&mut self) {
        self.current_vote = None;
        self.has_voted = false;
    }
}

/// Insertion-ordered set of clients, unique by id.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClientCollection {
    clients: Vec<Client>,
}

impl ClientCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a client. Returns `false` and leaves the collection untouched
    /// if a client with the same id is already present.
    pub fn add(&mut self, client: Client) -> bool {
        if self.contains(client.id()) {
            return false;
        }
        self.clients.push(client);
        true
    }

    pub fn remove(&mut self, id: &str) -> Option<Client> {
        let pos = self.clients.iter().position(|c| c.id == id)?;
        Some(self.clients.remove(pos))
    }

    pub fn get(&self, id: &str) -> Option<&Client> {
        self.clients.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Client> {
        self.clients.iter_mut().find(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn first(&self) -> Option<&Client> {
        self.clients.first()
    }

    pub fn first_mut(&mut self) -> Option<&mut Client> {
        self.clients.first_mut()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Client> {
        self.clients.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Client> {
        self.clients.iter_mut()
    }

    /// Borrowed sub-view of the clients matching `pred`, in insertion order.
    pub fn filter<P>(&self, pred: P) -> ClientView<'_>
    where
        P: Fn(&Client) -> bool,
    {
        ClientView {
            clients: self.clients.iter().filter(|c| pred(c)).collect(),
        }
    }
}

impl FromIterator<Client> for ClientCollection {
    fn from_iter<I: IntoIterator<Item = Client>>(iter: I) -> Self {
        let mut collection = Self::new();
        for client in iter {
            collection.add(client);
        }
        collection
    }
}

impl<'a> IntoIterator for &'a ClientCollection {
    type Item = &'a Client;
    type IntoIter = std::slice::Iter<'a, Client>;

    fn into_iter(self) -> Self::IntoIter {
        self.clients.iter()
    }
}

/// A filtered, read-only view over a [`ClientCollection`]. Views filter
/// further, so queries chain: `clients.filter(voter).filter(voted).len()`.
#[derive(Debug, Clone)]
pub struct ClientView<'a> {
    clients: Vec<&'a Client>,
}

impl<'a> ClientView<'a> {
    pub fn filter<P>(&self, pred: P) -> ClientView<'a>
    where
        P: Fn(&Client) -> bool,
    {
        ClientView {
            clients: self.clients.iter().copied().filter(|c| pred(c)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    pub fn first(&self) -> Option<&'a Client> {
        self.clients.first().copied()
    }

    pub fn all<P>(&self, pred: P) -> bool
    where
        P: Fn(&Client) -> bool,
    {
        self.clients.iter().all(|c| pred(c))
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Client> + '_ {
        self.clients.iter().copied()
    }
}
