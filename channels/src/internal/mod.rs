pub(crate) mod waiter;
