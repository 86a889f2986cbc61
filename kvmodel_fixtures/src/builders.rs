//! Entity-bound request builders. Their chainable methods are generated from
//! the templates in [`crate::ops`].

use kvmodel::prelude::*;

use crate::models::{Customer, Order};

/// Reads the records of one order partition.
#[entity_builder(entity = Order)]
#[derive(Debug, Default)]
pub struct OrderQuery {
    request: Request<Order>,
}

impl OrderQuery {
    pub fn partition(id: &str) -> Self {
        let mut query = Self::default();
        let key = Order::build_partition_key(id);
        query
            .request
            .key_conditions
            .push(Order::fields().id.eq(&key).into_expr());
        query
    }
}

impl RequestBuilder for OrderQuery {
    type Entity = Order;

    fn request(&self) -> &Request<Order> {
        &self.request
    }

    fn request_mut(&mut self) -> &mut Request<Order> {
        &mut self.request
    }
}

impl KeyConditioned for OrderQuery {}
impl Filterable for OrderQuery {}
impl Sortable for OrderQuery {}
impl Projectable for OrderQuery {}

#[entity_builder(entity = Order, operations(set, only_if))]
#[derive(Debug, Default)]
pub struct OrderUpdate {
    request: Request<Order>,
}

impl RequestBuilder for OrderUpdate {
    type Entity = Order;

    fn request(&self) -> &Request<Order> {
        &self.request
    }

    fn request_mut(&mut self) -> &mut Request<Order> {
        &mut self.request
    }
}

impl Updatable for OrderUpdate {}
impl Conditional for OrderUpdate {}

#[entity_builder(entity = Customer, operations(filter, limit))]
#[derive(Debug, Default)]
pub struct CustomerScan {
    request: Request<Customer>,
}

impl RequestBuilder for CustomerScan {
    type Entity = Customer;

    fn request(&self) -> &Request<Customer> {
        &self.request
    }

    fn request_mut(&mut self) -> &mut Request<Customer> {
        &mut self.request
    }
}

impl Filterable for CustomerScan {}
impl Projectable for CustomerScan {}
