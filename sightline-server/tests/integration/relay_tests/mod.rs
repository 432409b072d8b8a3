mod test_relay_between_peers;
mod test_room_isolation;
