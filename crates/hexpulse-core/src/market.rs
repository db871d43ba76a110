//! Player-to-player market.
//!
//! A poster puts resources into escrow and names what they want back.
//! Any other player may accept the offer by paying the asked amount; the
//! escrowed goods then move to them and the payment moves to the poster.
//!
//! Every change to the offer list is broadcast as a `MarketUpdate`.

use crate::board::{PlayerId, Resource};
use crate::error::{SessionError, ValidationError};
use crate::events::{EventSink, ServerEvent};
use crate::player::Player;
use crate::resources::Cost;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Open offers a single player may have at once
pub const MAX_OFFERS_PER_PLAYER: usize = 3;

/// An open offer with its goods held in escrow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketOffer {
    pub id: u32,
    pub poster: PlayerId,
    pub poster_name: String,
    pub give: Cost,
    pub want: Resource,
    pub want_amount: u32,
    /// Session clock when posted
    pub posted_at: f64,
}

impl MarketOffer {
    fn price(&self) -> Cost {
        Cost::from([(self.want, self.want_amount)])
    }
}

#[derive(Debug, Clone, Default)]
pub struct Market {
    offers: BTreeMap<u32, MarketOffer>,
    next_id: u32,
}

impl Market {
    pub fn new() -> Self {
        Self {
            offers: BTreeMap::new(),
            next_id: 1,
        }
    }

    /// Open offers, oldest first
    pub fn offers(&self) -> impl Iterator<Item = &MarketOffer> {
        self.offers.values()
    }

    pub fn get(&self, id: u32) -> Option<&MarketOffer> {
        self.offers.get(&id)
    }

    pub fn len(&self) -> usize {
        self.offers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offers.is_empty()
    }

    pub fn offers_by(&self, player: PlayerId) -> usize {
        self.offers.values().filter(|o| o.poster == player).count()
    }

    /// Move `give` out of the poster's ledger into a new offer.
    pub fn post_offer(
        &mut self,
        poster: &mut Player,
        give: Cost,
        want: Resource,
        want_amount: u32,
        now: f64,
        sink: &mut dyn EventSink,
    ) -> Result<u32, SessionError> {
        if want_amount == 0 || give.is_empty() || give.values().any(|&n| n == 0) {
            return Err(ValidationError::InvalidAmount.into());
        }
        if give.contains_key(&want) {
            return Err(ValidationError::SameResourceTrade.into());
        }
        if self.offers_by(poster.id) >= MAX_OFFERS_PER_PLAYER {
            return Err(ValidationError::OfferLimit(MAX_OFFERS_PER_PLAYER).into());
        }
        if !poster.ledger.has_resources(&give) {
            return Err(ValidationError::Unaffordable.into());
        }

        poster.ledger.spend(&give, sink)?;

        let id = self.next_id.max(1);
        self.next_id = id + 1;
        self.offers.insert(
            id,
            MarketOffer {
                id,
                poster: poster.id,
                poster_name: poster.display_name.clone(),
                give,
                want,
                want_amount,
                posted_at: now,
            },
        );
        info!(player = poster.id, offer = id, "Posted market offer");
        self.broadcast(sink);
        Ok(id)
    }

    /// Settle an offer between `accepter` and its poster.
    ///
    /// Both ledgers are checked before anything moves, so a short payment
    /// or a full stack on either side leaves everything as it was.
    pub fn accept_offer(
        &mut self,
        players: &mut [Player],
        accepter: PlayerId,
        offer_id: u32,
        sink: &mut dyn EventSink,
    ) -> Result<MarketOffer, SessionError> {
        let offer = self
            .offers
            .get(&offer_id)
            .ok_or_else(|| ValidationError::NotFound(format!("offer {}", offer_id)))?;
        if offer.poster == accepter {
            return Err(ValidationError::OwnOffer.into());
        }

        let buyer_index = players
            .iter()
            .position(|p| p.id == accepter)
            .ok_or(ValidationError::UnknownPlayer(accepter))?;
        let seller_index = players
            .iter()
            .position(|p| p.id == offer.poster)
            .ok_or(ValidationError::UnknownPlayer(offer.poster))?;
        let (buyer, seller) = pair_mut(players, buyer_index, seller_index);

        let price = offer.price();
        if !buyer.ledger.has_resources(&price) {
            return Err(ValidationError::Unaffordable.into());
        }
        buyer.ledger.check_room(&offer.give)?;
        seller.ledger.check_room(&price)?;

        buyer.ledger.spend(&price, sink)?;
        buyer.ledger.receive(&offer.give, sink)?;
        seller.ledger.receive(&price, sink)?;

        let offer = self
            .offers
            .remove(&offer_id)
            .ok_or_else(|| ValidationError::NotFound(format!("offer {}", offer_id)))?;
        sink.broadcast(ServerEvent::OfferAccepted {
            offer_id,
            poster: offer.poster,
            accepter,
        });
        info!(
            poster = offer.poster,
            accepter,
            offer = offer_id,
            "Market offer accepted"
        );
        self.broadcast(sink);
        Ok(offer)
    }

    /// Withdraw an offer and return its escrow to the poster.
    ///
    /// The offer stays open if the refund would not fit.
    pub fn cancel_offer(
        &mut self,
        poster: &mut Player,
        offer_id: u32,
        sink: &mut dyn EventSink,
    ) -> Result<(), SessionError> {
        let offer = self
            .offers
            .get(&offer_id)
            .ok_or_else(|| ValidationError::NotFound(format!("offer {}", offer_id)))?;
        if offer.poster != poster.id {
            return Err(ValidationError::NotOwned.into());
        }

        poster.ledger.receive(&offer.give, sink)?;
        self.offers.remove(&offer_id);
        info!(player = poster.id, offer = offer_id, "Cancelled market offer");
        self.broadcast(sink);
        Ok(())
    }

    /// Drop every offer by a departing player. Escrow leaves with them.
    pub fn remove_player(&mut self, player: PlayerId, sink: &mut dyn EventSink) -> usize {
        let before = self.offers.len();
        self.offers.retain(|_, o| o.poster != player);
        let dropped = before - self.offers.len();
        if dropped > 0 {
            debug!(player, dropped, "Dropped offers of departed player");
            self.broadcast(sink);
        }
        dropped
    }

    /// Send everyone the current offer list
    pub fn broadcast(&self, sink: &mut dyn EventSink) {
        sink.broadcast(ServerEvent::MarketUpdate {
            offers: self.offers.values().cloned().collect(),
        });
    }
}

/// Two distinct players borrowed mutably at once
fn pair_mut(players: &mut [Player], a: usize, b: usize) -> (&mut Player, &mut Player) {
    if a < b {
        let (left, right) = players.split_at_mut(b);
        (&mut left[a], &mut right[0])
    } else {
        let (left, right) = players.split_at_mut(a);
        (&mut right[0], &mut left[b])
    }
}
