mod test_status;
