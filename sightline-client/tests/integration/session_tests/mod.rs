mod test_negotiation_failures;
